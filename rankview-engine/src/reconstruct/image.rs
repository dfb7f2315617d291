//! Channel planes and composed RGBA images

use rankview_common::{Channel, Dimensions, Error, PerChannel, Result};

/// One channel's reconstructed intensities, row-major, each in `[0, 255]`
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReconstruction(Vec<f32>);

impl ChannelReconstruction {
    /// Build a plane from arbitrary values, clamping into `[0, 255]`
    ///
    /// NaN becomes 0.
    pub fn clamped(mut values: Vec<f32>) -> Self {
        for v in values.iter_mut() {
            *v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 255.0) };
        }
        Self(values)
    }

    /// Wrap kernel output; the kernel guarantees the clamp
    pub(crate) fn from_clamped(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }
}

/// RGBA image built from three channel planes with opaque alpha
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeImage {
    dims: Dimensions,
    rgba: Vec<u8>,
}

impl CompositeImage {
    /// Interleave three planes into RGBA, alpha fixed at 255
    ///
    /// Intensities are rounded to the nearest byte value.
    pub fn compose(dims: Dimensions, planes: &PerChannel<ChannelReconstruction>) -> Result<Self> {
        let pixels = dims.pixel_count();
        for (channel, plane) in planes.iter() {
            if plane.len() != pixels {
                return Err(Error::InvalidDimensions(format!(
                    "{} plane has {} values, expected {} for {}x{}",
                    channel,
                    plane.len(),
                    pixels,
                    dims.width,
                    dims.height
                )));
            }
        }

        let red = planes[Channel::Red].as_slice();
        let green = planes[Channel::Green].as_slice();
        let blue = planes[Channel::Blue].as_slice();

        let mut rgba = Vec::with_capacity(pixels * 4);
        for p in 0..pixels {
            rgba.push(to_byte(red[p]));
            rgba.push(to_byte(green[p]));
            rgba.push(to_byte(blue[p]));
            rgba.push(255);
        }

        Ok(Self { dims, rgba })
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn width(&self) -> usize {
        self.dims.width
    }

    pub fn height(&self) -> usize {
        self.dims.height
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn into_rgba(self) -> Vec<u8> {
        self.rgba
    }

    /// RGBA of pixel `(x, y)`, `None` outside the image
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.dims.width || y >= self.dims.height {
            return None;
        }
        let offset = (y * self.dims.width + x) * 4;
        let px = &self.rgba[offset..offset + 4];
        Some([px[0], px[1], px[2], px[3]])
    }
}

fn to_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
