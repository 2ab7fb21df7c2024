// Microphone capture for voice feedback.
//
// The lifecycle only needs "start, then stop-with-samples or cancel", so the
// device sits behind a small trait. The cpal implementation owns its stream
// on a dedicated thread because cpal streams are not Send; samples are
// collected as mono f32 and WAV-encoded only when the blob is uploaded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info, warn};

use crate::error::{ReviewError, ReviewResult};

/// Captured audio, kept raw until upload
#[derive(Debug, Clone)]
pub struct AudioBlob {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBlob {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Encode as 16-bit mono PCM WAV
    pub fn to_wav_bytes(&self) -> ReviewResult<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| ReviewError::UploadError(format!("wav encode: {}", e)))?;
            for &sample in &self.samples {
                let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer
                    .write_sample(value)
                    .map_err(|e| ReviewError::UploadError(format!("wav encode: {}", e)))?;
            }
            writer
                .finalize()
                .map_err(|e| ReviewError::UploadError(format!("wav encode: {}", e)))?;
        }

        Ok(cursor.into_inner())
    }
}

/// An in-progress capture; exactly one of stop/cancel consumes it
pub trait ActiveCapture: Send {
    fn stop(self: Box<Self>) -> ReviewResult<AudioBlob>;
    fn cancel(self: Box<Self>);
}

/// A source of captures (the microphone, or a scripted device in tests)
pub trait RecordingDevice: Send + Sync {
    fn start(&self) -> ReviewResult<Box<dyn ActiveCapture>>;
}

/// Default-input-device microphone via cpal
pub struct CpalMicrophone;

impl RecordingDevice for CpalMicrophone {
    fn start(&self) -> ReviewResult<Box<dyn ActiveCapture>> {
        let samples: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
        let stop_flag = Arc::new(AtomicBool::new(false));

        let (setup_tx, setup_rx) = std::sync::mpsc::channel::<Result<u32, String>>();
        let thread_samples = samples.clone();
        let thread_stop = stop_flag.clone();

        // The stream lives on this thread until stop/cancel flips the flag
        let handle = std::thread::spawn(move || {
            run_capture_thread(thread_samples, thread_stop, setup_tx);
        });

        let sample_rate = match setup_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(message)) => {
                let _ = handle.join();
                return Err(ReviewError::DeviceUnavailable(message));
            }
            Err(_) => {
                let _ = handle.join();
                return Err(ReviewError::DeviceUnavailable(
                    "capture thread exited during setup".to_string(),
                ));
            }
        };

        info!("Microphone capture started at {} Hz", sample_rate);

        Ok(Box::new(CpalCapture {
            samples,
            stop_flag,
            handle,
            sample_rate,
        }))
    }
}

struct CpalCapture {
    samples: Arc<Mutex<Vec<f32>>>,
    stop_flag: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    sample_rate: u32,
}

impl CpalCapture {
    fn shut_down(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

impl ActiveCapture for CpalCapture {
    fn stop(self: Box<Self>) -> ReviewResult<AudioBlob> {
        self.shut_down();
        if self.handle.join().is_err() {
            return Err(ReviewError::DeviceUnavailable(
                "capture thread panicked".to_string(),
            ));
        }

        let samples = self
            .samples
            .lock()
            .map_err(|_| ReviewError::DeviceUnavailable("capture buffer poisoned".to_string()))?
            .clone();

        info!(
            "Microphone capture stopped with {} samples ({:.1}s)",
            samples.len(),
            samples.len() as f64 / self.sample_rate.max(1) as f64
        );

        Ok(AudioBlob {
            samples,
            sample_rate: self.sample_rate,
        })
    }

    fn cancel(self: Box<Self>) {
        self.shut_down();
        let _ = self.handle.join();
        info!("Microphone capture cancelled, samples discarded");
    }
}

fn run_capture_thread(
    samples: Arc<Mutex<Vec<f32>>>,
    stop_flag: Arc<AtomicBool>,
    setup_tx: std::sync::mpsc::Sender<Result<u32, String>>,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = setup_tx.send(Err("no default input device".to_string()));
            return;
        }
    };

    let config = match device.default_input_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = setup_tx.send(Err(format!("input config: {}", e)));
            return;
        }
    };

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let sample_format = config.sample_format();
    let stream_config: cpal::StreamConfig = config.into();

    let err_fn = |e: cpal::StreamError| error!("Capture stream error: {}", e);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => {
            let sink = samples.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _| push_mono(&sink, data, channels),
                err_fn,
                None,
            )
        }
        cpal::SampleFormat::I16 => {
            let sink = samples.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _| {
                    let converted: Vec<f32> =
                        data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                    push_mono(&sink, &converted, channels);
                },
                err_fn,
                None,
            )
        }
        cpal::SampleFormat::U16 => {
            let sink = samples.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[u16], _| {
                    let converted: Vec<f32> = data
                        .iter()
                        .map(|&s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0)
                        .collect();
                    push_mono(&sink, &converted, channels);
                },
                err_fn,
                None,
            )
        }
        other => {
            let _ = setup_tx.send(Err(format!("unsupported sample format: {:?}", other)));
            return;
        }
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = setup_tx.send(Err(format!("build stream: {}", e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = setup_tx.send(Err(format!("start stream: {}", e)));
        return;
    }

    if setup_tx.send(Ok(sample_rate)).is_err() {
        warn!("Capture starter went away before setup completed");
        return;
    }

    while !stop_flag.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
}

/// Average interleaved frames down to mono and append to the shared buffer
fn push_mono(sink: &Arc<Mutex<Vec<f32>>>, data: &[f32], channels: usize) {
    if channels <= 1 {
        if let Ok(mut buffer) = sink.lock() {
            buffer.extend_from_slice(data);
        }
        return;
    }

    if let Ok(mut buffer) = sink.lock() {
        for frame in data.chunks(channels) {
            buffer.push(frame.iter().sum::<f32>() / frame.len() as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_bytes_have_riff_header() {
        let blob = AudioBlob {
            samples: vec![0.0, 0.5, -0.5, 1.0, -1.0],
            sample_rate: 16000,
        };

        let bytes = blob.to_wav_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // 44-byte header + 2 bytes per sample
        assert_eq!(bytes.len(), 44 + 2 * blob.samples.len());
    }

    #[test]
    fn test_duration_from_sample_count() {
        let blob = AudioBlob {
            samples: vec![0.0; 32000],
            sample_rate: 16000,
        };
        assert!((blob.duration_seconds() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_push_mono_averages_channels() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        push_mono(&sink, &[1.0, 0.0, 0.5, 0.5], 2);
        let buffer = sink.lock().unwrap();
        assert_eq!(buffer.as_slice(), &[0.5, 0.5]);
    }
}
