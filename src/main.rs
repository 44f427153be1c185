use clap::{Args, Parser, Subcommand};
use cryptonoise::cli::{
    create_empty_latent, create_noise_latent, format_verification, show_identity, show_info,
    sign_latent_file, verify_latent_files, CreateOptions, SignFileOptions, VerifyFileOptions,
};
use cryptonoise::engine::SignOptions;
use cryptonoise::events::TracingSink;
use cryptonoise::identity::SecretKey;
use cryptonoise::params::{BlendRatio, ShuffleMode, SliceSeeding};
use cryptonoise::provenance::GenerationParameters;
use cryptonoise::tensor::{DType, Device, Shape};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Version info from build.rs
const VERSION: &str = env!("CRYPTONOISE_VERSION");
const BUILD: &str = env!("CRYPTONOISE_BUILD");
const PROFILE: &str = env!("CRYPTONOISE_PROFILE");
const GIT_HASH: &str = env!("CRYPTONOISE_GIT_HASH");

/// Environment variable holding the log filter
const LOG_ENV: &str = "CRYPTONOISE_LOG";

fn get_version() -> &'static str {
    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(|| {
        format!("{} {} build {} ({})", PROFILE, VERSION, BUILD, GIT_HASH)
    })
}

#[derive(Parser)]
#[command(name = "cryptonoise")]
#[command(author, about = "Key-derived latent noise shuffling with verifiable provenance", long_about = None)]
struct Cli {
    /// Print version
    #[arg(short = 'V', long)]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct LatentArgs {
    /// Latent shape as B,C,H,W
    #[arg(long, default_value = "1,4,64,64", value_parser = parse_shape)]
    shape: Shape,

    /// Element type
    #[arg(long, default_value = "f32", value_parser = parse_dtype)]
    dtype: DType,

    /// Device tag stored with the latent
    #[arg(long, default_value = "cpu", value_parser = parse_device)]
    device: Device,
}

impl From<LatentArgs> for CreateOptions {
    fn from(args: LatentArgs) -> Self {
        Self {
            shape: args.shape,
            dtype: args.dtype,
            device: args.device,
        }
    }
}

#[derive(Args)]
struct SigningArgs {
    /// Blend ratio between original and shuffled noise (0.0-1.0)
    #[arg(long, default_value = "0.5", value_parser = parse_blend)]
    blend: BlendRatio,

    /// Shuffle mode: pixel, block_8, block_16 or block_32
    #[arg(long, default_value = "block_8", value_parser = parse_mode)]
    mode: ShuffleMode,

    /// Per-slice seeding for pixel mode: keyed or offset
    #[arg(long, default_value = "keyed", value_parser = parse_seeding)]
    slice_seeding: SliceSeeding,

    /// Host generation seed, recorded in provenance
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Host sampling steps, recorded in provenance
    #[arg(long, default_value = "20")]
    steps: u32,

    /// Host CFG scale, recorded in provenance
    #[arg(long, default_value = "8.0")]
    cfg: f64,

    /// Host sampler name, recorded in provenance
    #[arg(long, default_value = "euler")]
    sampler: String,

    /// Host scheduler name, recorded in provenance
    #[arg(long, default_value = "normal")]
    scheduler: String,
}

impl From<SigningArgs> for SignOptions {
    fn from(args: SigningArgs) -> Self {
        Self {
            blend: args.blend,
            mode: args.mode,
            slice_seeding: args.slice_seeding,
            generation: GenerationParameters {
                seed: args.seed,
                steps: args.steps,
                cfg: args.cfg,
                sampler: args.sampler,
                scheduler: args.scheduler,
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write an all-zero latent
    #[command(alias = "e")]
    Empty {
        #[command(flatten)]
        latent: LatentArgs,

        /// Output latent file
        output: PathBuf,
    },

    /// Write a standard-normal latent
    #[command(alias = "n")]
    Noise {
        #[command(flatten)]
        latent: LatentArgs,

        /// Noise seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Output latent file
        output: PathBuf,
    },

    /// Sign a latent with a secret key
    #[command(alias = "s")]
    Sign {
        /// Secret key
        #[arg(long, env = "CRYPTONOISE_KEY", hide_env_values = true)]
        key: String,

        #[command(flatten)]
        signing: SigningArgs,

        /// Write the provenance record to this file
        #[arg(long)]
        provenance: Option<PathBuf>,

        /// Input latent file
        input: PathBuf,

        /// Output latent file
        output: PathBuf,
    },

    /// Show the public identity derived from a key
    #[command(alias = "id")]
    Identity {
        /// Secret key
        #[arg(long, env = "CRYPTONOISE_KEY", hide_env_values = true)]
        key: String,

        /// Latent shape recorded in the identity
        #[arg(long, default_value = "1,4,64,64", value_parser = parse_shape)]
        shape: Shape,
    },

    /// Check that a signed latent was produced by a key
    #[command(alias = "v")]
    Verify {
        /// Disclosed secret key
        #[arg(long, env = "CRYPTONOISE_KEY", hide_env_values = true)]
        key: String,

        #[command(flatten)]
        signing: SigningArgs,

        /// Provenance record; its parameters replace the signing flags
        #[arg(long)]
        provenance: Option<PathBuf>,

        /// Latent that was signed
        original: PathBuf,

        /// Latent claimed to be signed
        candidate: PathBuf,
    },

    /// Show information about a latent file
    #[command(alias = "i")]
    Info {
        /// Latent file to inspect
        file: PathBuf,
    },
}

fn parse_shape(s: &str) -> Result<Shape, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn parse_dtype(s: &str) -> Result<DType, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn parse_device(s: &str) -> Result<Device, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn parse_blend(s: &str) -> Result<BlendRatio, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn parse_mode(s: &str) -> Result<ShuffleMode, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn parse_seeding(s: &str) -> Result<SliceSeeding, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Handle --version flag
    if cli.version {
        println!("cryptonoise {}", get_version());
        return ExitCode::SUCCESS;
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            use clap::CommandFactory;
            if let Err(e) = Cli::command().print_help() {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
            println!();
            return ExitCode::SUCCESS;
        }
    };

    init_logging();

    let result = match command {
        Commands::Empty { latent, output } => {
            create_empty_latent(&output, &latent.into()).map(|shape| {
                println!("Wrote empty {} latent to {}", shape, output.display());
                ExitCode::SUCCESS
            })
        }

        Commands::Noise {
            latent,
            seed,
            output,
        } => create_noise_latent(&output, seed, &latent.into()).map(|shape| {
            println!("Wrote {} noise latent to {}", shape, output.display());
            ExitCode::SUCCESS
        }),

        Commands::Sign {
            key,
            signing,
            provenance,
            input,
            output,
        } => {
            let options = SignFileOptions {
                key,
                sign: signing.into(),
                provenance,
            };
            sign_latent_file(&input, &output, &options, &TracingSink).map(|report| {
                println!("{}", report.signature);
                ExitCode::SUCCESS
            })
        }

        Commands::Identity { key, shape } => {
            print!("{}", show_identity(&SecretKey::new(key), shape));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Verify {
            key,
            signing,
            provenance,
            original,
            candidate,
        } => {
            let options = VerifyFileOptions {
                key,
                sign: signing.into(),
                provenance,
            };
            verify_latent_files(&original, &candidate, &options, &TracingSink).map(|report| {
                print!("{}", format_verification(&report));
                if report.is_match() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            })
        }

        Commands::Info { file } => show_info(&file).map(|info| {
            print!("{}", info);
            ExitCode::SUCCESS
        }),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
