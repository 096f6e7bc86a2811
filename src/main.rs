use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gxpfw", about = "Grandstream GXP firmware image tool")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decrypt and extract every partition of a firmware image
    Extract {
        input_file: PathBuf,
        output_folder: PathBuf,
    },
    /// Replace one partition of a firmware image with a revised payload
    Remaster {
        input_file: PathBuf,
        output_file: PathBuf,
        revised_image: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("gxpfw GXP firmware tool");
    let args = Args::parse();

    match args.command {
        Commands::Extract { input_file, output_folder } => {
            println!("Input file: {}", input_file.display());
            println!("Output folder: {}", output_folder.display());
            gxpfw::extract_gxp(&input_file, &output_folder)?;
        }
        Commands::Remaster { input_file, output_file, revised_image } => {
            println!("Input file: {}", input_file.display());
            println!("Output file: {}", output_file.display());
            println!("Revised image: {}", revised_image.display());
            gxpfw::remaster_gxp(&input_file, &output_file, &revised_image)?;
        }
    }

    Ok(())
}
