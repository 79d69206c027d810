use display_interface::{DataFormat, DisplayError, WriteOnlyDataCommand};
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};

const WIDTH: usize = 128;
const HEIGHT: usize = 64;
const PAGES: usize = HEIGHT / 8;
const BUFFER_SIZE: usize = WIDTH * PAGES;
// Two 8-row pages per text line gives four 16-pixel lines.
const LINE_PAGES: usize = 2;
pub const LINES: usize = PAGES / LINE_PAGES;

pub const CONTRAST_BRIGHT: u8 = 0xCF;
pub const CONTRAST_DIM: u8 = 0x01;

const INIT_SEQUENCE: &[u8] = &[
    0xAE, // display off
    0xD5, 0x80, // clock divide
    0xA8, 0x3F, // multiplex 64
    0xD3, 0x00, // display offset
    0x40, // start line 0
    0x8D, 0x14, // charge pump on
    0x20, 0x00, // horizontal addressing
    0xA1, // segment remap
    0xC8, // COM scan descending
    0xDA, 0x12, // COM pins
    0x81, CONTRAST_BRIGHT,
    0xD9, 0xF1, // precharge
    0xDB, 0x40, // VCOM deselect
    0xA4, // follow RAM
    0xA6, // normal polarity
    0xAF, // display on
];

/// SSD1306 128x64 panel driven as a four line text display.
pub struct Ssd1306<DI> {
    interface: DI,
    buffer: [u8; BUFFER_SIZE],
}

impl<DI: WriteOnlyDataCommand> Ssd1306<DI> {
    pub fn new(interface: DI) -> Self {
        Self {
            interface,
            buffer: [0; BUFFER_SIZE],
        }
    }

    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.interface.send_commands(DataFormat::U8(INIT_SEQUENCE))?;
        self.buffer.fill(0);
        self.flush_pages(0, PAGES - 1)
    }

    pub fn set_contrast(&mut self, level: u8) -> Result<(), DisplayError> {
        self.interface.send_commands(DataFormat::U8(&[0x81, level]))
    }

    /// Redraws one text line and pushes only its pages to the panel.
    pub fn show_line(&mut self, line: usize, text: &str) -> Result<(), DisplayError> {
        if line >= LINES {
            return Ok(());
        }
        let first = line * LINE_PAGES;
        let last = first + LINE_PAGES - 1;
        self.buffer[first * WIDTH..(last + 1) * WIDTH].fill(0);

        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let top = Point::new(0, (first * 8) as i32);
        let _ = Text::with_baseline(text, top, style, Baseline::Top).draw(self);

        self.flush_pages(first, last)
    }

    fn flush_pages(&mut self, first: usize, last: usize) -> Result<(), DisplayError> {
        self.interface.send_commands(DataFormat::U8(&[
            0x21,
            0,
            (WIDTH - 1) as u8,
            0x22,
            first as u8,
            last as u8,
        ]))?;
        self.interface
            .send_data(DataFormat::U8(&self.buffer[first * WIDTH..(last + 1) * WIDTH]))
    }

    #[cfg(test)]
    fn is_lit(&self, x: usize, y: usize) -> bool {
        self.buffer[x + (y / 8) * WIDTH] & (1 << (y % 8)) != 0
    }
}

impl<DI> DrawTarget for Ssd1306<DI> {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (usize::try_from(point.x), usize::try_from(point.y)) else {
                continue;
            };
            if x >= WIDTH || y >= HEIGHT {
                continue;
            }
            let index = x + (y / 8) * WIDTH;
            let bit = 1_u8 << (y % 8);
            match color {
                BinaryColor::On => self.buffer[index] |= bit,
                BinaryColor::Off => self.buffer[index] &= !bit,
            }
        }
        Ok(())
    }
}

impl<DI> OriginDimensions for Ssd1306<DI> {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}
