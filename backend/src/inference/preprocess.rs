use image::{DynamicImage, ImageFormat, ImageReader};
use ndarray::Array4;
use std::io::Cursor;

use crate::config::{ImageConfig, TensorLayout};

/// Batched image tensor handed to the classifier.
pub type Tensor = Array4<f32>;

const ACCEPTED_FORMATS: [ImageFormat; 3] = [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Gif];

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),
}

/// Turns encoded image bytes into the fixed-shape tensor the classifier was
/// trained on: RGB, resized to `size`, multiplied by `scale`, batch of one.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    width: u32,
    height: u32,
    layout: TensorLayout,
    scale: f32,
    filter: image::imageops::FilterType,
}

impl Preprocessor {
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            width: config.size[0],
            height: config.size[1],
            layout: config.layout,
            scale: config.scale,
            filter: config.resize_filter.into(),
        }
    }

    pub fn input_shape(&self) -> [usize; 4] {
        let (h, w) = (self.height as usize, self.width as usize);
        match self.layout {
            TensorLayout::Nhwc => [1, h, w, 3],
            TensorLayout::Nchw => [1, 3, h, w],
        }
    }

    pub fn prepare(&self, image_data: &[u8]) -> Result<Tensor, PreprocessError> {
        let image = decode(image_data)?;
        let resized = image
            .resize_exact(self.width, self.height, self.filter)
            .to_rgb8();

        let mut tensor = Tensor::zeros(self.input_shape());
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for (c, value) in pixel.0.iter().enumerate() {
                let value = f32::from(*value) * self.scale;
                match self.layout {
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
                }
            }
        }
        Ok(tensor)
    }
}

fn decode(image_data: &[u8]) -> Result<DynamicImage, PreprocessError> {
    let reader = ImageReader::new(Cursor::new(image_data))
        .with_guessed_format()
        .map_err(|e| PreprocessError::UnsupportedImageFormat(e.to_string()))?;

    match reader.format() {
        Some(format) if ACCEPTED_FORMATS.contains(&format) => {}
        Some(format) => {
            return Err(PreprocessError::UnsupportedImageFormat(format!(
                "{:?} is not accepted",
                format
            )));
        }
        None => {
            return Err(PreprocessError::UnsupportedImageFormat(
                "unrecognized encoding".into(),
            ));
        }
    }

    let image = reader
        .decode()
        .map_err(|e| PreprocessError::UnsupportedImageFormat(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(PreprocessError::UnsupportedImageFormat(
            "image has no pixels".into(),
        ));
    }
    Ok(image)
}
