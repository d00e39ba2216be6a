//! Format negotiation.
//!
//! Selection is a pure function of the enumerated catalogs and a choice. Where
//! the choice comes from is a [`Selector`]: fixed configuration or an
//! interactive prompt.

use crate::catalog::{FormatCatalog, FrameSize, NegotiatedFormat, PixelFormat, SizeCatalog};
use crate::error::NegotiationError;
use crate::source::CaptureDevice;
use std::fmt::Display;
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

/// Enumerate the device's pixel formats.
pub fn enumerate<D: CaptureDevice>(device: &mut D) -> Result<FormatCatalog, NegotiationError> {
    let formats = device.formats()?;
    if formats.is_empty() {
        return Err(NegotiationError::NoFormats);
    }
    debug!("Device offers {} pixel formats", formats.len());
    Ok(FormatCatalog::from_formats(formats))
}

/// Enumerate frame sizes for `format`, ascending by area.
pub fn enumerate_sizes<D: CaptureDevice>(
    device: &mut D,
    format: &PixelFormat,
) -> Result<SizeCatalog, NegotiationError> {
    let sizes = device.frame_sizes(format.fourcc)?;
    if sizes.is_empty() {
        return Err(NegotiationError::NoFrameSizes(format.to_string()));
    }
    Ok(SizeCatalog::from_sizes(sizes))
}

pub fn select_format(catalog: &FormatCatalog, choice: usize) -> Result<PixelFormat, NegotiationError> {
    catalog.select(choice).cloned()
}

pub fn select_size(catalog: &SizeCatalog, choice: usize) -> Result<FrameSize, NegotiationError> {
    catalog.select(choice).copied()
}

/// Request `format` at `size`. The returned format is what the device applied
/// and may differ from the request.
pub fn negotiate<D: CaptureDevice>(
    device: &mut D,
    format: &PixelFormat,
    size: FrameSize,
) -> Result<NegotiatedFormat, NegotiationError> {
    let negotiated = device.set_format(format.fourcc, size.width, size.height)?;
    if negotiated.fourcc != format.fourcc || negotiated.width != size.width || negotiated.height != size.height {
        warn!(
            "Requested {} ({}), device applied {}",
            format.fourcc, size, negotiated
        );
    }
    Ok(negotiated)
}

/// Source of 1-based catalog choices.
pub trait Selector {
    fn choose_format(&mut self, catalog: &FormatCatalog) -> Result<usize, NegotiationError>;

    fn choose_size(
        &mut self,
        format: &PixelFormat,
        catalog: &SizeCatalog,
    ) -> Result<usize, NegotiationError>;
}

/// Choices taken from configuration. Out-of-range choices fail negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSelector {
    pub format: usize,
    pub size: usize,
}

impl FixedSelector {
    pub fn new(format: usize, size: usize) -> Self {
        Self { format, size }
    }
}

impl Default for FixedSelector {
    fn default() -> Self {
        Self { format: 1, size: 1 }
    }
}

impl Selector for FixedSelector {
    fn choose_format(&mut self, _catalog: &FormatCatalog) -> Result<usize, NegotiationError> {
        Ok(self.format)
    }

    fn choose_size(
        &mut self,
        _format: &PixelFormat,
        _catalog: &SizeCatalog,
    ) -> Result<usize, NegotiationError> {
        Ok(self.size)
    }
}

/// Interactive selection over a line reader and a prompt writer.
///
/// Invalid or out-of-range input is re-prompted until a valid choice is read.
pub struct PromptSelector<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptSelector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn list<T: Display>(&mut self, entries: &[T]) -> Result<(), NegotiationError> {
        for (i, entry) in entries.iter().enumerate() {
            writeln!(self.output, "[{}] {}", i + 1, entry).map_err(NegotiationError::Prompt)?;
        }
        Ok(())
    }

    fn read_choice(&mut self, prompt: &str, len: usize) -> Result<usize, NegotiationError> {
        let mut line = String::new();
        loop {
            write!(self.output, "{} [1-{}]: ", prompt, len).map_err(NegotiationError::Prompt)?;
            self.output.flush().map_err(NegotiationError::Prompt)?;

            line.clear();
            let read = self.input.read_line(&mut line).map_err(NegotiationError::Prompt)?;
            if read == 0 {
                return Err(NegotiationError::InputClosed);
            }
            match line.trim().parse::<usize>() {
                Ok(choice) if (1..=len).contains(&choice) => return Ok(choice),
                _ => writeln!(self.output, "Invalid input. Try again").map_err(NegotiationError::Prompt)?,
            }
        }
    }
}

impl<R: BufRead, W: Write> Selector for PromptSelector<R, W> {
    fn choose_format(&mut self, catalog: &FormatCatalog) -> Result<usize, NegotiationError> {
        writeln!(self.output, "Available formats:").map_err(NegotiationError::Prompt)?;
        self.list(catalog.entries())?;
        self.read_choice("Choose format", catalog.len())
    }

    fn choose_size(
        &mut self,
        format: &PixelFormat,
        catalog: &SizeCatalog,
    ) -> Result<usize, NegotiationError> {
        writeln!(self.output, "Supported frame sizes for format {}", format)
            .map_err(NegotiationError::Prompt)?;
        self.list(catalog.entries())?;
        self.read_choice("Choose size", catalog.len())
    }
}

/// Enumerate, select and apply a format in one pass.
#[tracing::instrument(skip_all)]
pub fn negotiate_with<D: CaptureDevice, S: Selector + ?Sized>(
    device: &mut D,
    selector: &mut S,
) -> Result<NegotiatedFormat, NegotiationError> {
    let formats = enumerate(device)?;
    let format = select_format(&formats, selector.choose_format(&formats)?)?;

    let sizes = enumerate_sizes(device, &format)?;
    let size = select_size(&sizes, selector.choose_size(&format, &sizes)?)?;

    let negotiated = negotiate(device, &format, size)?;
    info!("Resulting image format: {}", negotiated);
    Ok(negotiated)
}
