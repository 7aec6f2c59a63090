use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use gladia_client::config::{ClientConfig, YamlConfig};
use gladia_client::core::live::{
    BitDepth, LanguageConfig, LiveClient, LiveSession, MessagesConfig, SampleRate, SessionConfig,
};
use gladia_client::core::rest::{
    DiarizationConfig, GladiaRestClient, JobStatus, ListResultsQuery, SubtitleFormat,
    SubtitlesConfig, TranscriptionRequest, TranscriptionResult,
};
use gladia_client::utils::format_bytes;

/// Gladia speech-to-text client
#[derive(Parser, Debug)]
#[command(name = "gladia")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream a 16-bit PCM WAV file to a live session in real time
    Live {
        #[arg(short = 'f', long = "file", value_name = "WAV")]
        file: PathBuf,

        /// Audio per frame in milliseconds
        #[arg(long = "chunk-ms", default_value_t = 100)]
        chunk_ms: u64,

        /// Send base64 `audio_chunk` JSON frames instead of binary frames
        #[arg(long = "json-frames")]
        json_frames: bool,

        /// Print partial transcripts too
        #[arg(long)]
        partials: bool,

        /// Expected language (repeatable)
        #[arg(short = 'l', long = "language")]
        languages: Vec<String>,

        /// Seconds to wait for post-processing results after the stop frame
        #[arg(long = "grace-secs", default_value_t = 30)]
        grace_secs: u64,
    },

    /// Upload an audio file and print its audio URL
    Upload { file: PathBuf },

    /// Transcribe a local file or an audio URL with the pre-recorded API
    Transcribe {
        /// Local file (uploaded first) or http(s) URL
        input: String,

        #[arg(long)]
        diarization: bool,

        #[arg(long = "speakers")]
        number_of_speakers: Option<u32>,

        #[arg(short = 'l', long = "language")]
        languages: Vec<String>,

        #[arg(long)]
        summarize: bool,

        /// Subtitle formats to generate (srt, vtt)
        #[arg(long = "subtitles", value_parser = parse_subtitle_format)]
        subtitles: Vec<SubtitleFormat>,

        /// Print the job id and return without waiting
        #[arg(long = "no-wait")]
        no_wait: bool,

        /// Give up polling after this many seconds
        #[arg(long = "timeout-secs", default_value_t = 600)]
        timeout_secs: u64,
    },

    /// Manage pre-recorded results
    Results {
        #[command(subcommand)]
        action: ResultsAction,
    },
}

#[derive(Subcommand, Debug)]
enum ResultsAction {
    List {
        #[arg(long, default_value_t = 0)]
        offset: u32,

        #[arg(long, default_value_t = 20)]
        limit: u32,

        /// Filter by status (repeatable)
        #[arg(long)]
        status: Vec<JobStatus>,
    },
    Get { id: String },
    Delete { id: String },
}

fn parse_subtitle_format(value: &str) -> Result<SubtitleFormat, String> {
    match value.to_lowercase().as_str() {
        "srt" => Ok(SubtitleFormat::Srt),
        "vtt" => Ok(SubtitleFormat::Vtt),
        other => Err(format!("unsupported subtitle format: {other}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Must be installed before any TLS connection is attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let (config, live_defaults) = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            let config = ClientConfig::from_file(path).map_err(|e| anyhow!(e.to_string()))?;
            let live = YamlConfig::from_file(path)
                .map_err(|e| anyhow!(e.to_string()))?
                .live
                .unwrap_or_default();
            (config, live)
        }
        None => (
            ClientConfig::from_env().map_err(|e| anyhow!(e.to_string()))?,
            SessionConfig::default(),
        ),
    };

    match cli.command {
        Commands::Live {
            file,
            chunk_ms,
            json_frames,
            partials,
            languages,
            grace_secs,
        } => {
            let options = LiveOptions {
                chunk_ms,
                json_frames,
                partials,
                languages,
                grace: Duration::from_secs(grace_secs),
            };
            run_live(config, live_defaults, &file, options).await
        }
        Commands::Upload { file } => {
            let client = GladiaRestClient::new(config)?;
            let upload = client.upload(&file).await?;
            println!("{}", upload.audio_url);
            println!(
                "  {} | {} | {:.1}s | {} channel(s)",
                upload.audio_metadata.filename,
                format_bytes(upload.audio_metadata.size),
                upload.audio_metadata.audio_duration,
                upload.audio_metadata.number_of_channels
            );
            Ok(())
        }
        Commands::Transcribe {
            input,
            diarization,
            number_of_speakers,
            languages,
            summarize,
            subtitles,
            no_wait,
            timeout_secs,
        } => {
            let client = GladiaRestClient::new(config)?;
            let audio_url = if input.starts_with("http://") || input.starts_with("https://") {
                input
            } else {
                client.upload(Path::new(&input)).await?.audio_url
            };

            let request = TranscriptionRequest {
                diarization: diarization || number_of_speakers.is_some(),
                diarization_config: number_of_speakers.map(|n| DiarizationConfig {
                    number_of_speakers: Some(n),
                    ..Default::default()
                }),
                summarization: summarize,
                subtitles: !subtitles.is_empty(),
                subtitles_config: (!subtitles.is_empty()).then(|| SubtitlesConfig {
                    formats: subtitles,
                    ..Default::default()
                }),
                language_config: (!languages.is_empty()).then(|| LanguageConfig {
                    languages,
                    code_switching: false,
                }),
                ..TranscriptionRequest::new(audio_url)
            };

            let job = client.pre_recorded(&request).await?;
            println!("Job {} submitted", job.id);
            if no_wait {
                return Ok(());
            }

            let result = client
                .wait_for_result(
                    &job.id,
                    Duration::from_secs(2),
                    Duration::from_secs(timeout_secs),
                )
                .await?;
            print_result(&result);
            Ok(())
        }
        Commands::Results { action } => {
            let client = GladiaRestClient::new(config)?;
            match action {
                ResultsAction::List {
                    offset,
                    limit,
                    status,
                } => {
                    let query = ListResultsQuery {
                        offset,
                        limit,
                        status,
                        ..Default::default()
                    };
                    let page = client.list_results(&query).await?;
                    for item in &page.items {
                        println!("{}\t{}\t{}", item.id, item.status.as_str(), item.created_at);
                    }
                    if let Some(next) = page.next {
                        println!("next: {next}");
                    }
                }
                ResultsAction::Get { id } => {
                    let result = client.get_result(&id).await?;
                    print_result(&result);
                }
                ResultsAction::Delete { id } => {
                    client.delete_result(&id).await?;
                    println!("Deleted {id}");
                }
            }
            Ok(())
        }
    }
}

fn print_result(result: &TranscriptionResult) {
    println!("{} [{}]", result.id, result.status.as_str());
    if let Some(code) = result.error_code {
        println!("error code: {code}");
    }
    let Some(output) = &result.result else {
        return;
    };
    if let Some(transcription) = &output.transcription {
        for utterance in &transcription.utterances {
            match utterance.speaker {
                Some(speaker) => println!(
                    "[{:>7.2}s] speaker {}: {}",
                    utterance.start, speaker, utterance.text
                ),
                None => println!("[{:>7.2}s] {}", utterance.start, utterance.text),
            }
        }
        for subtitle in &transcription.subtitles {
            println!("--- {} ---\n{}", subtitle.format, subtitle.subtitles);
        }
    }
    if let Some(summary) = &output.summarization {
        println!("summary: {summary}");
    }
}

// =============================================================================
// Live Streaming
// =============================================================================

struct LiveOptions {
    chunk_ms: u64,
    json_frames: bool,
    partials: bool,
    languages: Vec<String>,
    grace: Duration,
}

async fn run_live(
    config: ClientConfig,
    defaults: SessionConfig,
    file: &Path,
    options: LiveOptions,
) -> anyhow::Result<()> {
    let mut reader =
        hound::WavReader::open(file).with_context(|| format!("opening {}", file.display()))?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        bail!("only 16-bit integer PCM WAV files are supported");
    }
    let sample_rate = SampleRate::try_from(spec.sample_rate).map_err(|e| anyhow!(e))?;

    let audio: Vec<u8> = reader
        .samples::<i16>()
        .map(|sample| sample.map(i16::to_le_bytes))
        .collect::<Result<Vec<_>, _>>()?
        .concat();

    let mut session_config = SessionConfig {
        bit_depth: BitDepth::Sixteen,
        sample_rate,
        channels: u32::from(spec.channels),
        ..defaults
    };
    if !options.languages.is_empty() {
        session_config.language_config = Some(LanguageConfig {
            languages: options.languages.clone(),
            code_switching: options.languages.len() > 1,
        });
    }
    if options.partials {
        let mut messages = session_config
            .messages_config
            .take()
            .unwrap_or_else(MessagesConfig::default);
        messages.receive_partial_transcripts = true;
        session_config.messages_config = Some(messages);
    }

    info!(
        "Streaming {} ({}, {:.1}s of audio)",
        file.display(),
        format_bytes(audio.len() as u64),
        session_config.bytes_to_seconds(audio.len())
    );

    let client = LiveClient::new(config)?;
    let session = client.connect(&session_config).await?;
    register_printers(&session, options.partials);

    if !session.start().await {
        bail!("failed to open live session {}", session.session_id());
    }

    let bytes_per_chunk = (session_config.sample_rate.as_hz() as u64
        * u64::from(session_config.channels)
        * 2
        * options.chunk_ms
        / 1000)
        .max(2) as usize;
    let mut ticker = tokio::time::interval(Duration::from_millis(options.chunk_ms));

    for chunk in audio.chunks(bytes_per_chunk) {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping early");
                break;
            }
        }
        let sent = if options.json_frames {
            session.send_audio_json(chunk).await
        } else {
            session.send_audio_binary(chunk.to_vec()).await
        };
        if !sent {
            warn!("Session stopped accepting audio");
            break;
        }
    }

    session.close(options.grace).await;
    Ok(())
}

fn register_printers(session: &LiveSession, partials: bool) {
    let events = session.events();

    events.on_transcript(move |msg| async move {
        match msg.data() {
            Some(data) if data.is_final => {
                println!("[{:>7.2}s] {}", data.utterance.start, data.utterance.text)
            }
            Some(data) if partials => println!("  ... {}", data.utterance.text),
            Some(_) => {}
            None => {
                if let Some(error) = msg.error() {
                    warn!("Transcript error: {}", error);
                }
            }
        }
    });
    events.on_speech_start(|msg| async move {
        if let Some(data) = msg.data() {
            info!("Speech started at {:.2}s", data.time);
        }
    });
    events.on_speech_end(|msg| async move {
        if let Some(data) = msg.data() {
            info!("Speech ended at {:.2}s", data.time);
        }
    });
    events.on_translation(|msg| async move {
        if let Some(data) = msg.data() {
            println!(
                "  ({}) {}",
                data.target_language, data.translated_utterance.text
            );
        }
    });
    events.on_post_transcript(|msg| async move {
        if let Some(data) = msg.data() {
            println!("--- full transcript ---\n{}", data.full_transcript);
        }
    });
    events.on_summarization(|msg| async move {
        if let Some(data) = msg.data() {
            println!("--- summary ---\n{}", data.results);
        }
    });
    events.on_chapterization(|msg| async move {
        if let Some(data) = msg.data() {
            for chapter in &data.results {
                println!("[{:>7.2}s] {}", chapter.start, chapter.headline);
            }
        }
    });
    events.on_stop_recording_acknowledgment(|msg| async move {
        if let Some(data) = &msg.data {
            info!(
                "Recording stopped after {:.1}s, {:.1}s left to process",
                data.recording_duration, data.recording_left_to_process
            );
        }
    });
    events.on_error(|message| async move {
        warn!("Live session error: {}", message);
    });
    events.on_disconnected(|| async {
        info!("Live session closed");
    });
}
