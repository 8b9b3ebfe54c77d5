//! Prompt composition and presets.

use crate::image::types::GenerationMode;
use serde::Serialize;

/// Instructions sent ahead of the user's text in gesture mode.
///
/// The model receives the pose image first and the subject image second, so
/// "Image 1" and "Image 2" refer to request positions.
pub const GESTURE_TEMPLATE: &str = "\
Context: You are provided with two images.
Image 1: A reference image showing a specific BODY POSE and GESTURE.
Image 2: A reference image of a CHARACTER/PERSON (Subject).

Task: Generate a new image of the CHARACTER from Image 2 performing the EXACT POSE from Image 1.

Instructions:
- The face, clothes, and physical appearance must match the Subject (Image 2).
- The body position, arm/leg angles, and hand gestures must strictly match the Pose Reference (Image 1).
- Additional context: ";

/// Returns the prompt text actually transmitted for `mode`.
pub fn effective_prompt(mode: GenerationMode, user_text: &str) -> String {
    match mode {
        GenerationMode::Standard => user_text.to_string(),
        GenerationMode::Gesture => format!("{GESTURE_TEMPLATE}{user_text}"),
    }
}

/// A canned prompt offered as a shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromptPreset {
    /// Short identifier (`pencil-sketch`).
    pub slug: &'static str,
    /// Display name.
    pub label: &'static str,
    /// Text placed in the prompt.
    pub prompt: &'static str,
    /// Mode the preset belongs to.
    pub mode: GenerationMode,
}

const PRESETS: &[PromptPreset] = &[
    PromptPreset {
        slug: "cyberpunk-city",
        label: "Cyberpunk City",
        prompt: "Change the background to a futuristic cyberpunk city.",
        mode: GenerationMode::Standard,
    },
    PromptPreset {
        slug: "pencil-sketch",
        label: "Pencil Sketch",
        prompt: "Turn this into a pencil sketch drawing.",
        mode: GenerationMode::Standard,
    },
    PromptPreset {
        slug: "golden-robot",
        label: "Golden Robot",
        prompt: "A golden robot",
        mode: GenerationMode::Gesture,
    },
    PromptPreset {
        slug: "superhero",
        label: "Superhero",
        prompt: "A superhero in a red suit",
        mode: GenerationMode::Gesture,
    },
];

/// Presets offered in `mode`.
pub fn presets_for(mode: GenerationMode) -> impl Iterator<Item = &'static PromptPreset> {
    PRESETS.iter().filter(move |p| p.mode == mode)
}

/// Looks up a preset by slug in any mode.
pub fn find_preset(slug: &str) -> Option<&'static PromptPreset> {
    PRESETS.iter().find(|p| p.slug.eq_ignore_ascii_case(slug))
}
