use serde::{Deserialize, Serialize};

/// Literal reply the prompt asks for when no food is visible.
pub const NO_FOOD_DETECTED: &str = "No food detected";

/// Error type for AI operations
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("Failed to get response from API: {status}")]
    Api { status: u16 },
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AiError {
    /// HTTP status for `Api` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status } => Some(*status),
            _ => None,
        }
    }
}

/// One food item from the model's comma-separated reply.
///
/// Quantities are kept as the model wrote them (`"19"`, `"19g"`, `"~2"`);
/// `calories` is parsed when it is a plain integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionEntry {
    pub item: String,
    pub calories: Option<u32>,
    pub sugar: String,
    pub fat: String,
    pub protein: String,
    pub iron: String,
    pub carbohydrates: String,
}

/// Split a model reply into nutrition rows.
///
/// Returns an empty list for the "No food detected" sentinel. Lines that do
/// not carry all seven fields are skipped.
pub fn parse_nutrition(reply: &str) -> Vec<NutritionEntry> {
    if reply.trim().trim_end_matches('.').eq_ignore_ascii_case(NO_FOOD_DETECTED) {
        return Vec::new();
    }

    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let entry = parse_line(line);
            if entry.is_none() {
                log::debug!("Skipping unparsed reply line: {}", line);
            }
            entry
        })
        .collect()
}

fn parse_line(line: &str) -> Option<NutritionEntry> {
    // The item name may itself contain commas ("Yogurt, Greek"), so the six
    // quantities are taken from the right.
    let mut fields: Vec<&str> = line.rsplitn(7, ',').map(str::trim).collect();
    if fields.len() != 7 {
        return None;
    }
    fields.reverse();
    let [item, calories, sugar, fat, protein, iron, carbohydrates] = fields[..] else {
        return None;
    };
    if item.is_empty() {
        return None;
    }

    Some(NutritionEntry {
        item: item.to_string(),
        calories: calories.parse().ok(),
        sugar: sugar.to_string(),
        fat: fat.to_string(),
        protein: protein.to_string(),
        iron: iron.to_string(),
        carbohydrates: carbohydrates.to_string(),
    })
}
