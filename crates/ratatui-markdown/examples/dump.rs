use ratatui_markdown::MarkdownOptions;
use ratatui_markdown::render_markdown;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return Ok(());
    }

    let mut width: u16 = 80;
    let mut options = MarkdownOptions::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--width" => width = parse_u16(&args, &mut i, "--width")?,
            "--cell-width" => {
                options.table_cell_width = parse_u16(&args, &mut i, "--cell-width")?;
            }
            "--list-indent" => options.list_indent = parse_u16(&args, &mut i, "--list-indent")?,
            "--base-url" => options.base_url = Some(parse_string(&args, &mut i, "--base-url")?),
            "--show-link-definitions" => {
                options.show_link_definitions = true;
                i += 1;
            }
            "--hard-wrap" => {
                options.eol_as_newline = true;
                i += 1;
            }
            _ => break,
        }
    }

    let input = if i < args.len() {
        let path = &args[i];
        let input = fs::read_to_string(path)?;
        if options.base_url.is_none()
            && let Some(parent) = Path::new(path).parent()
        {
            let abs = fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
            options.base_url = Some(format!("{}/", abs.display()));
        }
        input
    } else {
        let mut s = String::new();
        io::stdin().read_to_string(&mut s)?;
        s
    };

    let doc = render_markdown(&input, &options)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    for line in doc.plain_lines(width, &options) {
        println!("{line}");
    }
    for (label, destination) in doc.references.iter() {
        tracing::debug!(label, destination = destination.unwrap_or(""), "reference");
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        "Usage: dump [options] [path]\n\
\n\
Options:\n\
  --width <n>                 Wrap width (default: 80)\n\
  --cell-width <n>            Table cell width (default: 16)\n\
  --list-indent <n>           Columns per list nesting level (default: 2)\n\
  --base-url <url>            Resolve relative links/images against this base\n\
  --show-link-definitions     Render [label]: destination lines\n\
  --hard-wrap                 Treat soft line breaks as line breaks\n\
  -h, --help                  Show this help\n\
\n\
If [path] is omitted, reads Markdown from stdin.\n\
Set RUST_LOG=ratatui_markdown=debug for pipeline logs on stderr."
    );
}

fn parse_u16(args: &[String], i: &mut usize, flag: &str) -> io::Result<u16> {
    let Some(v) = args.get(*i + 1) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{flag} expects a value"),
        ));
    };
    *i += 2;
    v.parse::<u16>().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{flag} invalid u16: {e}"),
        )
    })
}

fn parse_string(args: &[String], i: &mut usize, flag: &str) -> io::Result<String> {
    let Some(v) = args.get(*i + 1) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{flag} expects a value"),
        ));
    };
    *i += 2;
    Ok(v.to_string())
}
