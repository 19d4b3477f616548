use dermscan::analysis::Analyzer;
use dermscan::classification::ClassificationTable;
use dermscan::config::ImageConfig;
use dermscan::inference::{Classifier, InferenceEngine, InferenceError, Preprocessor, Tensor};
use dermscan::storage::LocalStorage;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

pub const BOUNDARY: &str = "dermscan-test-boundary";
pub const MELANOMA: [f32; 8] = [0.01, 0.03, 0.00, 0.01, 0.02, 0.01, 0.92, 0.00];

/// Stand-in for the trained network that always returns the same scores.
pub struct FixedClassifier(pub Vec<f32>);

impl Classifier for FixedClassifier {
    fn predict(&self, _input: &Tensor) -> Result<Vec<f32>, InferenceError> {
        Ok(self.0.clone())
    }
}

pub fn ready_analyzer(scores: &[f32], dir: &Path) -> Analyzer {
    let table = ClassificationTable::skin_lesions().unwrap();
    let preprocessor = Preprocessor::new(&ImageConfig::default());
    let sample_input = Tensor::zeros(preprocessor.input_shape());
    let engine = InferenceEngine::new(
        Arc::new(FixedClassifier(scores.to_vec())),
        &table,
        &sample_input,
        false,
    )
    .unwrap();
    Analyzer::new(
        Arc::new(engine),
        LocalStorage::new(dir),
        preprocessor,
        table,
        10 * 1024 * 1024,
    )
}

pub fn unavailable_analyzer(dir: &Path) -> Analyzer {
    let table = ClassificationTable::skin_lesions().unwrap();
    Analyzer::new(
        Arc::new(InferenceEngine::unavailable("no model artifact", &table)),
        LocalStorage::new(dir),
        Preprocessor::new(&ImageConfig::default()),
        table,
        10 * 1024 * 1024,
    )
}

pub fn jpeg_fixture() -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| {
        Rgb([(x * 4) as u8, (y * 4) as u8, 128])
    }))
    .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
    .unwrap();
    bytes
}

/// Encodes a single form part; returns the content type header and body.
pub fn multipart_body(
    field_name: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field_name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
