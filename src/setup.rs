//! Interactive settings editor (`banter settings`)

use dialoguer::{Confirm, Password, Select};

use crate::app::App;
use crate::preferences::AVAILABLE_VOICES;

/// Run the interactive settings editor
///
/// Offers the voice list and a credential prompt; every accepted change is written
/// to the preference store immediately.
///
/// # Errors
///
/// Returns error if user input fails or preferences cannot be written
pub fn run_settings(app: &mut App) -> anyhow::Result<()> {
    println!("Banter Settings\n");
    println!("Preferences file: {}\n", app.config().preferences_path.display());

    // 1. Voice selection
    let current_voice = app.voice().to_string();
    let mut voices: Vec<&str> = AVAILABLE_VOICES.to_vec();
    if !voices.contains(&current_voice.as_str()) && !current_voice.is_empty() {
        voices.push(&current_voice);
    }
    let default_voice = voices
        .iter()
        .position(|&v| v == current_voice)
        .unwrap_or(0);

    let voice_idx = Select::new()
        .with_prompt("Select a voice")
        .items(&voices)
        .default(default_voice)
        .interact()?;
    let voice = voices[voice_idx].to_string();

    if voice != current_voice {
        app.set_voice(&voice)?;
        println!("Voice set to {voice}");
    }

    // 2. API credential
    let stored = app.preferences().api_token.clone();
    let prompt = if stored.is_empty() {
        "API key".to_string()
    } else {
        format!("API key (current: {}, leave blank to keep)", mask_secret(&stored))
    };

    let key_input = Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()?;

    if !key_input.is_empty() {
        app.set_credential(&key_input)?;
        println!("API key saved");
    } else if !stored.is_empty()
        && Confirm::new()
            .with_prompt("Remove the stored API key?")
            .default(false)
            .interact()?
    {
        app.set_credential("")?;
        println!("API key removed");
    }

    println!("\nSettings saved. Run `banter` to start chatting.");

    Ok(())
}

/// Secrets shorter than this are hidden entirely
const MIN_REVEAL_LEN: usize = 16;

/// Show only the edges of a secret, e.g. `sk-a...wxyz`
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() >= MIN_REVEAL_LEN {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}
