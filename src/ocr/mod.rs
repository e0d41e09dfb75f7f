pub mod engine;
pub mod parse;
pub mod preprocess;
pub mod select;
pub mod setup;

pub use engine::{Recognition, TesseractEngine, TextRecognizer};
pub use parse::{format_for_display, parse_all, ParsedRecord};
pub use preprocess::{generate_variants, split_horizontal, Variant, VariantTag};
pub use select::{select_best, Candidate};

use image::DynamicImage;

/// High-level function: one HUD line crop → best candidate.
///
/// Builds the enhancement variants at `target_height`, runs the recognizer on
/// each and keeps the reading with the most parsed records.
pub fn read_line<R: TextRecognizer + ?Sized>(
    recognizer: &R,
    crop: &DynamicImage,
    target_height: u32,
) -> Candidate {
    select_best(recognizer, generate_variants(crop, target_height))
}
