use flow_lessons::lessons::Lesson;

fn main() -> anyhow::Result<()> {
    Lesson::Galaxy.run()
}
