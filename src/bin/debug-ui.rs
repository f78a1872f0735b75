use flow_lessons::lessons::Lesson;

fn main() -> anyhow::Result<()> {
    Lesson::DebugUi.run()
}
