//! The lessons, one [`GraphicsFlow`](crate::flow::GraphicsFlow) each.
//!
//! Every lesson has a binary under `src/bin/` and can be started by name, natively
//! through [`Lesson::run`] or on the web through `run_lesson`.

use std::{fmt, str::FromStr};

use anyhow::bail;

use crate::{
    camera::{Camera, OrbitControls},
    context::Context,
    flow::{self, FlowConsturctor},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub mod basic_scene;
pub mod debug_ui;
pub mod galaxy;
pub mod haunted_house;
pub mod materials;
pub mod particles;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lesson {
    BasicScene,
    DebugUi,
    Materials,
    HauntedHouse,
    Particles,
    Galaxy,
}

impl Lesson {
    pub const ALL: [Lesson; 6] = [
        Lesson::BasicScene,
        Lesson::DebugUi,
        Lesson::Materials,
        Lesson::HauntedHouse,
        Lesson::Particles,
        Lesson::Galaxy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Lesson::BasicScene => "basic-scene",
            Lesson::DebugUi => "debug-ui",
            Lesson::Materials => "materials",
            Lesson::HauntedHouse => "haunted-house",
            Lesson::Particles => "particles",
            Lesson::Galaxy => "galaxy",
        }
    }

    pub fn constructor(&self) -> FlowConsturctor<(), ()> {
        match self {
            Lesson::BasicScene => basic_scene::constructor(),
            Lesson::DebugUi => debug_ui::constructor(),
            Lesson::Materials => materials::constructor(),
            Lesson::HauntedHouse => haunted_house::constructor(),
            Lesson::Particles => particles::constructor(),
            Lesson::Galaxy => galaxy::constructor(),
        }
    }

    /// Opens the window and blocks until it is closed (natively).
    pub fn run(self) -> anyhow::Result<()> {
        log::info!("starting lesson {self}");
        flow::run(vec![self.constructor()])
    }
}

impl fmt::Display for Lesson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Lesson {
    type Err = anyhow::Error;

    /// Accepts the lesson name with dashes or underscores, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match Lesson::ALL.into_iter().find(|l| l.name() == normalized) {
            Some(lesson) => Ok(lesson),
            None => bail!(
                "unknown lesson {s:?}, expected one of {}",
                Lesson::ALL.map(|l| l.name()).join(", ")
            ),
        }
    }
}

/// Start position, title and damped orbit controls shared by the lessons that can be
/// looked around in.
pub(crate) fn look_around(ctx: &mut Context, title: &str, position: [f32; 3]) {
    ctx.set_title(title);
    ctx.camera.camera = Camera::new(position);
    ctx.camera.controls = OrbitControls::damped();
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn run_lesson(name: &str) -> Result<(), JsValue> {
    let lesson: Lesson = name.parse().map_err(|e| JsValue::from_str(&format!("{e}")))?;
    lesson
        .run()
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lesson_names() {
        for lesson in Lesson::ALL {
            assert_eq!(lesson.name().parse::<Lesson>().unwrap(), lesson);
        }
        assert_eq!("Haunted_House".parse::<Lesson>().unwrap(), Lesson::HauntedHouse);
        assert_eq!(" galaxy ".parse::<Lesson>().unwrap(), Lesson::Galaxy);
    }

    #[test]
    fn rejects_unknown_lessons() {
        let err = "shaders".parse::<Lesson>().unwrap_err();
        assert!(err.to_string().contains("basic-scene"));
    }
}
