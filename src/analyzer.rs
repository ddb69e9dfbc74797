//! Bridges an uploaded image to the model and back.

use crate::error::{DishVisionError, Result};
use crate::image::read_image;
use crate::llm::{LlmBroker, LlmMessage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Instruction sent with every image unless a prompt file overrides it.
pub const DEFAULT_PROMPT: &str = r#"
Analyze the image and demonstrate your culinary expertise by providing the following for each dish:

## Ingredients:
List all the ingredients displayed in the picture, categorized for clarity (e.g., protein, vegetables, aromatics, spices, sauces).
For complex dishes, identify any hidden or implied ingredients based on your knowledge and experience.
Specify quantities using standard units (e.g., grams, cups, tablespoons) whenever possible.

## Nutrition Information:
Estimate the nutritional value per serving, including calories, macronutrients (carbohydrates, protein, fat), and any prominent vitamins or minerals.
Base your estimation on standard serving sizes and typical ingredient profiles.
Clearly state any assumptions or limitations in your nutritional analysis.

## Cooking Steps:
Provide a clear and concise step-by-step guide to recreate the dish.
Include cooking methods, temperatures, and timings when visible or inferable from the image.
Consider potential variations or alternative techniques based on your expertise.
Aim for a format suitable for home cooks, balancing detail with conciseness.


## Remember:
You are a Vietnamese master chef, showcasing your knowledge and understanding of diverse culinary styles and techniques.
Be creative and resourceful, inferring information from the image and drawing upon your vast culinary experience.
Present your findings in a clear, concise, and informative manner, suitable for an audience of aspiring cooks.
Let your culinary prowess shine! Analyze each dish image and provide a comprehensive breakdown of its ingredients, cooking steps, and nutritional value.

Important. Answer everything in Vietnamese
"#;

/// Sends dish photos to the model with a fixed instruction prompt.
pub struct DishAnalyzer {
    broker: LlmBroker,
    prompt: String,
}

impl DishAnalyzer {
    pub fn new(broker: LlmBroker, prompt: impl Into<String>) -> Self {
        Self {
            broker,
            prompt: prompt.into(),
        }
    }

    /// Send `prompt` and the image at `path` as one message and return the model's text.
    ///
    /// The image is read before anything goes over the network, so a missing file fails
    /// with [`DishVisionError::ImageNotFound`] without contacting the model.
    pub async fn generate_response(&self, prompt: &str, path: impl AsRef<Path>) -> Result<String> {
        let image = read_image(path.as_ref())?;
        debug!("Loaded {} byte image from {:?}", image.data.len(), path.as_ref());

        let message = LlmMessage::user(prompt).with_images(vec![image]);
        self.broker.generate(&[message]).await
    }

    /// Handle one upload event: analyze the first file and ignore the rest.
    ///
    /// Returns the analyzed path (for the preview) together with the generated text.
    pub async fn process_uploaded_files(&self, files: &[PathBuf]) -> Result<(PathBuf, String)> {
        let filepath = files.first().ok_or(DishVisionError::NoUpload)?;

        if files.len() > 1 {
            info!("Received {} files, analyzing only {:?}", files.len(), filepath);
        }

        let response = self.generate_response(&self.prompt, filepath).await?;
        Ok((filepath.clone(), response))
    }
}
