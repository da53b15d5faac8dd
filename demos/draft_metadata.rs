use rec_header_draft::{draft, DioGroup, SessionConfig};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <data_path> <animal> <date> [out_dir] [reconfig]", args[0]);
        process::exit(2);
    }
    let out_dir = args.get(4).map(String::as_str).unwrap_or("yaml");

    let mut config = SessionConfig::new(&args[1], &args[2], &args[3])
        .with_dio(DioGroup::new("Din", &[(0, "poke_left"), (1, "poke_right")]));
    if let Some(reconfig) = args.get(5) {
        config = config.with_reconfig(reconfig);
    }

    match draft(config, out_dir) {
        Ok((helper, path)) => {
            println!("Session: {}", helper.session_id());
            println!("Header: {}", helper.header_file().display());
            println!("Detected tasks: {:?}", helper.detected_tasks());
            println!(
                "{} ntrodes in {} electrode groups",
                helper.ntrodes().len(),
                helper.electrode_groups().len()
            );
            for group in helper.electrode_groups() {
                println!("  group {}: {}", group.id, group.device_type);
            }

            if !helper.diagnostics().is_empty() {
                println!("\nNeeds attention:");
                for d in helper.diagnostics() {
                    println!("  - {}", d);
                }
            }
            println!("\nDraft written to {}", path.display());
        }
        Err(e) => {
            eprintln!("Error drafting metadata: {}", e);
            process::exit(1);
        }
    }
}
