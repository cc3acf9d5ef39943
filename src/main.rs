use std::{
    fs::{read, write},
    io,
    path::PathBuf,
    process::ExitCode,
    result::Result,
};

use clap::{Parser, Subcommand};
use sfnt_remap::{ChecksumMode, Font, FontContainer, RemapOptions, tables::Tag};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Message(String),
    #[error("read: {0}")]
    Read(#[source] io::Error),
    #[error("write: {0}")]
    Write(#[source] io::Error),
    #[error("{0}")]
    Font(#[from] sfnt_remap::Error),
    #[error("{0}")]
    Buffer(#[from] sfnt_remap::buffer::BufferError),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "sfnt-remap", version)]
#[command(about = "Map every glyph of a font to a private use code point, or inspect its GSUB/COLR/CPAL tables")]
struct Cli {
    /// Log decoding details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a copy of INPUT whose cmap maps PUA_BASE + i to glyph i
    Remap {
        input: PathBuf,
        output: PathBuf,
        /// Additional table to drop (GSUB, GPOS, GDEF and DSIG always are)
        #[arg(short, long = "drop", value_name = "TAG")]
        drop: Vec<Tag>,
        /// Code point of glyph 0
        #[arg(long, value_parser = parse_code_point, default_value = "0xF0000")]
        pua_base: u32,
        /// Recompute table checksums instead of copying them
        #[arg(long)]
        recompute_checksums: bool,
    },
    /// List GSUB features and their lookup indices
    Features { input: PathBuf },
    /// List CPAL palettes
    Colors { input: PathBuf },
    /// List the color layers of a glyph
    Layers { input: PathBuf, glyph: u16 },
}

fn parse_code_point(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("U+")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid code point {s:?}: {e}"))
}

impl Cli {
    fn run(&self) -> ExitCode {
        self.execute().map_or_else(
            |e| {
                eprintln!("{e}");
                ExitCode::FAILURE
            },
            |_| ExitCode::SUCCESS,
        )
    }

    fn execute(&self) -> CliResult<()> {
        match &self.command {
            Command::Remap {
                input,
                output,
                drop,
                pua_base,
                recompute_checksums,
            } => {
                let data = read(input).map_err(CliError::Read)?;
                let mut container = FontContainer::with_dropped(&data, drop)?;
                let options = RemapOptions {
                    pua_base: *pua_base,
                    checksums: if *recompute_checksums {
                        ChecksumMode::Recompute
                    } else {
                        ChecksumMode::Preserve
                    },
                };
                let remapped = container.remap_with(&options)?;
                write(output, &remapped).map_err(CliError::Write)?;

                println!(
                    "{} glyphs mapped from U+{:X}, {} tables written to {}",
                    container.num_glyphs()?,
                    pua_base,
                    container.len(),
                    output.display()
                );
                Ok(())
            }
            Command::Features { input } => {
                let data = read(input).map_err(CliError::Read)?;
                let font = Font::new(&data)?;
                let gsub = font
                    .gsub()?
                    .ok_or_else(|| CliError::Message("no GSUB table in font".into()))?;

                for (tag, lookups) in gsub.features()? {
                    let lookups: Vec<String> = lookups.iter().map(u16::to_string).collect();
                    println!("{tag}\t{}", lookups.join(" "));
                }
                Ok(())
            }
            Command::Colors { input } => {
                let data = read(input).map_err(CliError::Read)?;
                let font = Font::new(&data)?;
                let cpal = font
                    .cpal()?
                    .ok_or_else(|| CliError::Message("no CPAL table in font".into()))?;

                for (i, palette) in cpal.palettes().iter().enumerate() {
                    let colors: Vec<String> = palette.iter().map(ToString::to_string).collect();
                    println!("{i}\t{}", colors.join(" "));
                }
                Ok(())
            }
            Command::Layers { input, glyph } => {
                let data = read(input).map_err(CliError::Read)?;
                let font = Font::new(&data)?;

                for layer in font.color_layers(*glyph)?.iter() {
                    match layer.color {
                        Some(color) => println!("{}\t{color}", layer.glyph),
                        None => println!("{}\t-", layer.glyph),
                    }
                }
                Ok(())
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    cli.run()
}
