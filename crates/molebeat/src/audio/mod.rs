mod playback;
mod wav_source;

pub use playback::PlaybackStream;
pub use wav_source::load_wav;
