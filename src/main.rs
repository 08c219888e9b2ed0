use anyhow::Context as _;
use std::{
    fs::File,
    io::{BufReader, Read as _},
};
use wiki_seo::{Frame, ParameterExpander, TagParser};

fn print_usage() {
    let exe = std::env::args().next().unwrap_or_default();
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("Usage: {exe} [options] [<input.txt>]\n");
    println!("Reads the content of a <seo> tag from the input file, or stdin, and");
    println!("prints the parsed arguments as JSON.\n");
    println!("or, use environment variables:");
    println!("    WIKI_SEO_INPUT");
    println!("    WIKI_SEO_FRAME\n");
    println!("Options:");
    println!("    --args: Treat each input line as one {{{{#seo:}}}} argument");
    println!("    --frame <frame.json>: Template arguments for {{{{{{name}}}}}} parameters\n");
}

fn usage<T>(err: &'static str) -> anyhow::Result<T> {
    print_usage();
    Err(anyhow::Error::msg(err))
}

fn opt_free_arg(args: &mut pico_args::Arguments, key: &str) -> anyhow::Result<Option<String>> {
    if let Some(arg) = args.opt_free_from_str::<String>()? {
        Ok(Some(arg))
    } else {
        Ok(std::env::var(key).ok())
    }
}

fn load_frame(path: &str) -> anyhow::Result<Frame> {
    let file = File::open(path).with_context(|| format!("could not open frame {path}"))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("could not parse frame {path}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print_usage();
        return Ok(());
    }

    let split_lines = args.contains("--args");
    let frame_path = args
        .opt_value_from_str::<_, String>("--frame")?
        .or_else(|| std::env::var("WIKI_SEO_FRAME").ok());
    let _ = args.contains("--");
    let input_path = opt_free_arg(&mut args, "WIKI_SEO_INPUT")?;

    if !args.finish().is_empty() {
        return usage("Unknown extra arguments passed");
    }

    let frame = frame_path
        .as_deref()
        .map(load_frame)
        .transpose()?
        .unwrap_or_default();
    log::debug!("Loaded {} frame arguments", frame.len());

    let text = if let Some(path) = &input_path {
        std::fs::read_to_string(path).with_context(|| format!("could not read {path}"))?
    } else {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    };

    let expander = ParameterExpander::default();
    let results = if split_lines {
        TagParser.parse_args(text.lines(), &expander, &frame)?
    } else {
        TagParser.parse_text(Some(text.as_str()), &expander, &frame)?
    };

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
