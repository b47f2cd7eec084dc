use std::path::PathBuf;
use std::time::Instant;

use tts_frontend::{
    config::AssetPaths,
    engines::kokoro::{KokoroEngine, KokoroModelParams},
    SynthesisEngine, SynthesisRequest,
};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let assets = AssetPaths {
        model: PathBuf::from("kokoro-v1.0.onnx"),
        voices: PathBuf::from("voices-v1.0.bin"),
    };

    let load_start = Instant::now();
    let mut engine = KokoroEngine::load(&assets, KokoroModelParams::default())?;
    println!("Model loaded in {:.2?}", load_start.elapsed());

    println!("Available voices: {:?}", engine.list_voices().unwrap_or_default());

    let text = "Hello! This is Kokoro, a text to speech model with multilingual support.";
    let request = SynthesisRequest {
        text,
        voice: "af_heart",
        speed: 1.0,
        language: "en-us",
    };

    let synth_start = Instant::now();
    let audio = engine.synthesize(&request)?;
    let synth_dur = synth_start.elapsed();

    let speedup = audio.duration_secs() / synth_dur.as_secs_f64();
    println!(
        "Synthesized {:.2}s audio in {:.2?} ({:.1}x real-time)",
        audio.duration_secs(),
        synth_dur,
        speedup
    );

    audio.write_wav(&PathBuf::from("output.wav"))?;
    println!("Saved to output.wav");
    Ok(())
}
