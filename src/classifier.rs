use image::imageops::FilterType;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tch::{CModule, Device, Kind, Tensor};
use thiserror::Error;

/// Fixed, ordered label set the model was trained on. Model output index i
/// corresponds to `CLASS_NAMES[i]`.
pub const CLASS_NAMES: [&str; 5] = [
    "leaf_blight",
    "rust",
    "powdery_mildew",
    "healthy",
    "yellow_spot",
];

const INPUT_SIZE: u32 = 224;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("failed to read image file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("model error: {0}")]
    Model(#[from] tch::TchError),
    #[error("model returned {0} scores, expected {expected}", expected = CLASS_NAMES.len())]
    OutputShape(usize),
}

/// Pretrained TorchScript classifier, loaded once at startup and shared
/// read-only across requests.
#[derive(Clone)]
pub struct Classifier {
    model: Arc<Mutex<CModule>>,
}

impl Classifier {
    pub fn load(model_path: &str) -> Result<Self, ClassifierError> {
        let device = Device::cuda_if_available();
        let model = CModule::load_on_device(model_path, device)?;
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }

    /// Decodes the stored image and returns the highest-scoring label.
    pub fn predict(&self, image_path: &Path) -> Result<&'static str, ClassifierError> {
        let bytes = std::fs::read(image_path)?;
        let input = preprocess(&bytes)?;

        let output = self.model.lock().unwrap().forward_ts(&[input])?;
        let probs = output.softmax(-1, Kind::Float).view([-1]);

        let num_classes = probs.size()[0] as usize;
        let mut scores = vec![0f32; num_classes];
        probs.copy_data(&mut scores, num_classes);

        let index = argmax(&scores);
        CLASS_NAMES
            .get(index)
            .copied()
            .ok_or(ClassifierError::OutputShape(num_classes))
    }
}

/// Resize to the model's fixed input, then scale each RGB channel to [-1, 1]
/// (MobileNetV2 normalization), laid out NCHW.
fn preprocess(bytes: &[u8]) -> Result<Tensor, ClassifierError> {
    let img = image::load_from_memory(bytes)?
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut data = vec![0f32; 3 * plane];
    for (x, y, pixel) in img.enumerate_pixels() {
        let offset = (y * INPUT_SIZE + x) as usize;
        for channel in 0..3 {
            data[channel * plane + offset] = f32::from(pixel[channel]) / 127.5 - 1.0;
        }
    }

    Ok(Tensor::from_slice(&data).view([1, 3, INPUT_SIZE as i64, INPUT_SIZE as i64]))
}

/// Index of the highest score; ties resolve to the lowest index.
fn argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    for (index, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = index;
        }
    }
    best
}
