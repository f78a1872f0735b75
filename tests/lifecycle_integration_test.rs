#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod lifecycle {
    use flow_lessons::{
        context::Context,
        flow::{FlowConsturctor, GraphicsFlow, ImageTestResult, Out},
        render::Render,
    };
    use wgpu::Color;

    use crate::common::test_utils::State;

    enum Event {
        Test,
    }

    struct GraphicsElement;

    impl GraphicsFlow<State, Event> for GraphicsElement {
        fn on_init(&mut self, ctx: &mut Context, state: &mut State) -> Out<State, Event> {
            ctx.clear_colour = Color::TRANSPARENT;
            assert_eq!(state.frame_counter(), 0);
            assert_eq!(state.init_invocations(), 0);
            assert_eq!(state.update_invocations(), 0);
            assert_eq!(state.gui_invocations(), 0);

            state.init();
            Out::Empty
        }

        fn on_update(
            &mut self,
            _: &Context,
            state: &mut State,
            _: std::time::Duration,
        ) -> Out<State, Event> {
            assert_eq!(state.frame_counter(), state.update_invocations());
            assert_eq!(state.init_invocations(), 1);
            state.frame();
            state.update();

            let serve_sencha: Box<dyn FnOnce(&mut State)> = Box::new(|state: &mut State| {
                state.dummy_state.push('🍵');
            });
            let serve_mate: Box<dyn FnOnce(&mut State)> = Box::new(|state: &mut State| {
                state.dummy_state.push('🧉');
            });
            match state.frame_counter() {
                3 => Out::FutEvent(vec![Box::new(async move { Event::Test })]),
                5 => Out::FutFn(vec![
                    Box::new(async move { serve_sencha }),
                    Box::new(async move { serve_mate }),
                ]),
                x if x > 5 => {
                    assert!(state.dummy_state.contains('🧉'));
                    assert!(state.dummy_state.contains('🍵'));
                    // emojis are 4 bytes wide
                    assert_eq!(state.dummy_state.len(), 8, "{}", state.dummy_state);
                    Out::Empty
                }
                _ => Out::Empty,
            }
        }

        fn on_tick(&mut self, _: &Context, _: &mut State) -> Out<State, Event> {
            Out::Empty
        }

        fn on_device_events(
            &mut self,
            _: &Context,
            _: &mut State,
            _: &flow_lessons::DeviceEvent,
        ) -> Out<State, Event> {
            Out::Empty
        }

        fn on_window_events(
            &mut self,
            _: &Context,
            _: &mut State,
            _: &flow_lessons::WindowEvent,
        ) -> Out<State, Event> {
            Out::Empty
        }

        fn on_custom_events(&mut self, _: &Context, state: &mut State, _: Event) -> Option<Event> {
            // sent in frame 3
            assert!(state.frame_counter() >= 3);
            assert!(state.update_invocations() >= 3);
            None
        }

        fn on_gui(&mut self, gui: &egui::Context, state: &mut State) -> Out<State, Event> {
            // the panel is built after the frame's update
            assert!(state.gui_invocations() < state.update_invocations());
            state.gui();
            egui::Window::new("lifecycle").show(gui, |ui| ui.label("frame"));
            Out::Empty
        }

        fn on_render(&self) -> Render<'_> {
            Render::None
        }

        fn render_to_texture(
            &self,
            _: &Context,
            state: &mut State,
            _: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
        ) -> Result<ImageTestResult, anyhow::Error> {
            if state.frame_counter() > 6 {
                Ok(ImageTestResult::Passed)
            } else {
                Ok(ImageTestResult::Waiting)
            }
        }
    }

    #[test]
    fn should_run_hooks_in_order_and_resolve_futures() {
        let model_constructor: FlowConsturctor<State, Event> = Box::new(|_| {
            Box::pin(async move { Box::new(GraphicsElement) as Box<dyn GraphicsFlow<_, _>> })
        });

        if let Err(e) = flow_lessons::flow::run(vec![model_constructor]) {
            panic!("{}", e);
        }
    }
}
