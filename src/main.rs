//! Console front end: renders the form bindings as text and turns each stdin
//! line into one synthesis request.
//!
//! Lines starting with `:voice`, `:lang` or `:speed` change the selectors;
//! every other line is text to speak.

use std::io::{self, BufRead, Write};

use tts_frontend::app::{App, Form};
use tts_frontend::config::AppConfig;
use tts_frontend::engines::kokoro::KokoroLoader;

struct Selection {
    voice: String,
    language: String,
    speed: f32,
}

fn print_form(app: &App, form: &Form<'_>) {
    println!("Kokoro TTS");
    println!();
    for group in app.catalog.groups() {
        println!("{} ({}): {}", group.label(), group.code, group.voices.join(", "));
    }
    println!();
    println!("Languages: {}", form.languages.join(", "));
    println!(
        "Speed: {:.1}-{:.1} (step {:.1})",
        form.speed.min, form.speed.max, form.speed.step
    );
    println!(
        "Audio files go to {}",
        app.coordinator.output_dir().display()
    );
    println!();
    println!("Commands: :voice NAME, :lang TAG, :speed X. Any other line is spoken.");
}

fn apply_command(form: &Form<'_>, selection: &mut Selection, command: &str) -> String {
    let (name, value) = command.split_once(' ').unwrap_or((command, ""));
    let value = value.trim();
    match name {
        "voice" => {
            selection.voice = value.to_string();
            format!("Voice: {value}")
        }
        "lang" if form.languages.iter().any(|l| *l == value) => {
            selection.language = value.to_string();
            format!("Language: {value}")
        }
        "lang" => format!("Unknown language '{value}'"),
        "speed" => match value.parse::<f32>() {
            Ok(speed) if form.speed.accepts(speed) => {
                selection.speed = speed;
                format!("Speed: {speed:.1}")
            }
            _ => format!(
                "Speed must be a number between {:.1} and {:.1}",
                form.speed.min, form.speed.max
            ),
        },
        _ => format!("Unknown command ':{name}'"),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let app = App::bootstrap(&AppConfig::default(), KokoroLoader::default())?;
    let form = app.form();
    print_form(&app, &form);

    let mut selection = Selection {
        voice: form.default_voice.to_string(),
        language: form.default_language.to_string(),
        speed: form.speed.default,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        match line.strip_prefix(':') {
            Some(command) => println!("{}", apply_command(&form, &mut selection, command)),
            None => {
                let result = app.coordinator.generate(
                    &line,
                    &selection.voice,
                    selection.speed,
                    &selection.language,
                );
                if let Some(path) = &result.audio_path {
                    println!("{}", path.display());
                }
                println!("{}", result.status);
            }
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
    }

    Ok(())
}
