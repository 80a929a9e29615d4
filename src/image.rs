use crate::types::Point;

/// Trait for accessing pixel intensities from an image.
pub trait ImageAccess {
    /// Get the grayscale intensity at (x, y). Returns 0 for out-of-bounds pixels.
    /// Coordinates are in image space (not normalized).
    fn get_pixel(&self, x: i32, y: i32) -> u8;

    /// Image dimensions.
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// An owned grayscale image buffer implementing ImageAccess.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self {
            data,
            width,
            height,
        }
    }

    /// Create a zero-initialized image.
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; (width * height) as usize],
            width,
            height,
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: Fn(u32, u32) -> u8,
    {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Copy any image source into an owned buffer.
    pub fn copy_from<I: ImageAccess>(image: &I) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| {
            image.get_pixel(x as i32, y as i32)
        })
    }

    /// Set a pixel; out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, value: u8) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        self.data[(y as u32 * self.width + x as u32) as usize] = value;
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }
}

impl ImageAccess for GrayImage {
    fn get_pixel(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[(y as u32 * self.width + x as u32) as usize]
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Sample a pixel with bilinear interpolation for sub-pixel accuracy.
pub fn sample_bilinear<I: ImageAccess>(image: &I, p: Point) -> f32 {
    // Get integer coordinates of the four surrounding pixels
    let x0 = p.x.floor() as i32;
    let y0 = p.y.floor() as i32;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    // Compute fractional parts
    let fx = p.x - x0 as f32;
    let fy = p.y - y0 as f32;

    // Get the four surrounding pixel values
    let p00 = image.get_pixel(x0, y0) as f32;
    let p10 = image.get_pixel(x1, y0) as f32;
    let p01 = image.get_pixel(x0, y1) as f32;
    let p11 = image.get_pixel(x1, y1) as f32;

    // Bilinear interpolation
    let top = p00 * (1.0 - fx) + p10 * fx;
    let bottom = p01 * (1.0 - fx) + p11 * fx;
    top * (1.0 - fy) + bottom * fy
}
