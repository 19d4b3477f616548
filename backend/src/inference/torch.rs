use std::path::Path;
use std::sync::Mutex;
use tch::{CModule, Device, IValue, Kind, Tensor as TchTensor};

use super::model::{Classifier, InferenceError};
use super::preprocess::Tensor;

impl From<tch::TchError> for InferenceError {
    fn from(err: tch::TchError) -> Self {
        InferenceError::ModelError(err.to_string())
    }
}

/// TorchScript export of the lesion classifier.
///
/// The module is kept behind a mutex, so concurrent requests run one forward
/// pass at a time.
pub struct TorchClassifier {
    model: Mutex<CModule>,
    device: Device,
}

impl TorchClassifier {
    pub fn new(model_path: &Path) -> Result<Self, InferenceError> {
        let device = Device::cuda_if_available();
        let mut model = CModule::load_on_device(model_path, device)?;
        model.set_eval();
        Ok(Self {
            model: Mutex::new(model),
            device,
        })
    }
}

impl Classifier for TorchClassifier {
    fn predict(&self, input: &Tensor) -> Result<Vec<f32>, InferenceError> {
        let data = input.as_slice().ok_or_else(|| {
            InferenceError::ModelError("input tensor is not contiguous".into())
        })?;
        let shape: Vec<i64> = input.shape().iter().map(|d| *d as i64).collect();
        let tensor = TchTensor::from_slice(data)
            .view(shape.as_slice())
            .to_device(self.device);

        let output = {
            let model = self
                .model
                .lock()
                .map_err(|_| InferenceError::ModelError("model lock poisoned".into()))?;
            tch::no_grad(|| model.forward_is(&[IValue::Tensor(tensor)]))?
        };
        let output = match output {
            IValue::Tensor(t) => t,
            other => {
                return Err(InferenceError::ModelError(format!(
                    "unexpected model output: {:?}",
                    other
                )));
            }
        };

        let output_flat = output
            .to_device(Device::Cpu)
            .to_kind(Kind::Float)
            .view([-1]);
        let num_elements = output_flat.size()[0] as usize;
        let mut output_vec = vec![0.0f32; num_elements];
        output_flat.copy_data(&mut output_vec, num_elements);
        Ok(output_vec)
    }
}
