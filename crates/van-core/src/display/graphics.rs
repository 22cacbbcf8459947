//! [`DisplaySink`] over any embedded-graphics RGB565 draw target

use core::fmt::Debug;

use embedded_graphics::Drawable as EgDrawable;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::PrimitiveStyle;
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};

use super::colors::BACKGROUND;
use super::layout::{DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT, Slot};
use super::reconciler::DisplaySink;

/// Draws slots as text on a background-filled rectangle
pub struct GraphicsSink<D> {
    display: D,
}

impl<D> GraphicsSink<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    pub fn new(display: D) -> Self {
        Self { display }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn into_inner(self) -> D {
        self.display
    }

    /// Full-screen message in large type, e.g. before deep sleep.
    /// Leaves the screen out of sync with any reconciler, which must be
    /// invalidated before the next render.
    pub fn show_message(&mut self, message: &str, color: Rgb565) -> Result<(), D::Error> {
        self.display.clear(BACKGROUND)?;
        let center = Point::new(DISPLAY_WIDTH as i32 / 2, DISPLAY_HEIGHT as i32 / 2);
        let text_style = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Middle)
            .build();
        Text::with_text_style(
            message,
            center,
            MonoTextStyle::new(&FONT_10X20, color),
            text_style,
        )
        .draw(&mut self.display)?;
        Ok(())
    }
}

impl<D> DisplaySink for GraphicsSink<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
{
    type Error = D::Error;

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.display.clear(BACKGROUND)
    }

    fn draw(&mut self, slot: Slot, text: &str, color: Rgb565) -> Result<(), Self::Error> {
        let spec = slot.spec();
        spec.bounds()
            .into_styled(PrimitiveStyle::with_fill(BACKGROUND))
            .draw(&mut self.display)?;
        Text::with_baseline(
            text,
            spec.origin,
            MonoTextStyle::new(FONT, color),
            Baseline::Top,
        )
        .draw(&mut self.display)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::colors::{GREEN, WHITE};
    use embedded_graphics::mock_display::MockDisplay;

    fn mock() -> MockDisplay<Rgb565> {
        let mut display = MockDisplay::new();
        display.set_allow_out_of_bounds_drawing(true);
        display.set_allow_overdraw(true);
        display
    }

    #[test]
    fn test_draw_fills_slot_and_writes_text() {
        let mut sink = GraphicsSink::new(mock());
        sink.draw(Slot::Title, "VAN", WHITE).unwrap();

        let display = sink.into_inner();
        let spec = Slot::Title.spec();
        // Top-left of the slot is covered by the fill at least
        assert!(display.get_pixel(spec.origin).is_some());

        let mut lit = 0;
        for y in spec.origin.y..spec.origin.y + 10 {
            for x in spec.origin.x..spec.origin.x + 18 {
                if display.get_pixel(Point::new(x, y)) == Some(WHITE) {
                    lit += 1;
                }
            }
        }
        assert!(lit > 0);
    }

    #[test]
    fn test_redraw_replaces_previous_text() {
        let mut sink = GraphicsSink::new(mock());
        sink.draw(Slot::Title, "VAN", WHITE).unwrap();
        sink.draw(Slot::Title, "VAN", GREEN).unwrap();

        let display = sink.into_inner();
        let spec = Slot::Title.spec();
        for y in spec.origin.y..spec.origin.y + 10 {
            for x in spec.origin.x..spec.origin.x + 18 {
                assert_ne!(display.get_pixel(Point::new(x, y)), Some(WHITE));
            }
        }
    }
}
