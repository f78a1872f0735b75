//! `lesson <name>` starts any lesson by name.

use anyhow::Context as _;
use flow_lessons::lessons::Lesson;

fn main() -> anyhow::Result<()> {
    let name = std::env::args()
        .nth(1)
        .context("usage: lesson <basic-scene|debug-ui|materials|haunted-house|particles|galaxy>")?;
    let lesson: Lesson = name.parse()?;
    lesson.run()
}
