use std::fs;
use std::path::{Path, PathBuf};

use simscene_engine::geom::TessellationOptions;
use simscene_engine::registry;
use simscene_engine::scene::persist;
use simscene_engine::{Engine, Primitive, RenderOptions, Scene};

const USAGE: &str = r"scene_cli (simscene-engine)

USAGE:
  scene_cli list
  scene_cli template <identifier>... [--position <model>] [--out <scene.xml>] [--overwrite]
  scene_cli info <scene.xml>
  scene_cli render <scene.xml> --out <image.png> [options]

OPTIONS (render):
  --size <n>         Image width and height in pixels (default 128)
  --scale <s>        Scene units per pixel (default 0.05)
  --slices <n>       Angular divisions per primitive (default 50)
  --stacks <n>       Height bands per primitive (default 100)
  --epoch <jd>       Observation epoch for moving positions (default 0)
  --overwrite        Overwrite an existing output file
  -h, --help         Show this help

Set RUST_LOG=debug for progress output.
";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(err) = run() {
        eprintln!("scene_cli error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = Args::new(std::env::args().skip(1).collect());

    let Some(command) = args.next() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "list" => {
            print_models();
            Ok(())
        }
        "template" => cmd_template(&mut args),
        "info" => cmd_info(&mut args),
        "render" => cmd_render(&mut args),
        "-h" | "--help" | "help" => {
            print_usage();
            Ok(())
        }
        other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
    }
}

fn print_usage() {
    println!("{USAGE}");
}

fn print_models() {
    for descriptor in registry::models().descriptors() {
        println!(
            "{:<24} {:<18} {} parameters",
            descriptor.identifier,
            descriptor.name,
            descriptor.parameter_count()
        );
    }
    println!();
    println!("positions:");
    for descriptor in registry::positions().descriptors() {
        println!(
            "{:<24} {:<18} {} parameters",
            descriptor.identifier,
            descriptor.name,
            descriptor.parameter_count()
        );
    }
}

fn cmd_template(args: &mut Args) -> Result<(), String> {
    let mut identifiers = Vec::new();
    let mut out: Option<PathBuf> = None;
    let mut position: Option<String> = None;
    let mut overwrite = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => out = Some(PathBuf::from(args.value("--out")?)),
            "--position" => position = Some(args.value("--position")?),
            "--overwrite" => overwrite = true,
            flag if flag.starts_with("--") => {
                return Err(format!("unknown option `{flag}`\n\n{USAGE}"));
            }
            _ => identifiers.push(arg),
        }
    }
    if identifiers.is_empty() {
        return Err("template needs at least one primitive identifier".to_owned());
    }

    let mut scene = Scene::new();
    for identifier in &identifiers {
        let mut primitive = registry::models()
            .create(identifier)
            .map_err(|e| format!("{e}\n\n{}", available_models()))?;
        if let Some(position) = &position {
            let placement = registry::positions()
                .create(position)
                .map_err(|e| e.to_string())?;
            primitive.set_placement(placement);
        }
        scene.add_primitive(primitive);
    }
    let xml = persist::to_xml(&scene).map_err(|e| e.to_string())?;

    match out {
        Some(path) => {
            write_file(&path, xml.as_bytes(), overwrite)?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{xml}"),
    }
    Ok(())
}

fn cmd_info(args: &mut Args) -> Result<(), String> {
    let path = PathBuf::from(args.next().ok_or("missing scene file")?);
    let scene = load_scene(&path)?;
    print!("{scene}");
    println!("free parameters ({}):", scene.total_free_parameter_count());
    for label in scene.parameter_labels() {
        println!("  {label}");
    }
    Ok(())
}

fn cmd_render(args: &mut Args) -> Result<(), String> {
    let scene_path = PathBuf::from(args.next().ok_or("missing scene file")?);
    let mut out: Option<PathBuf> = None;
    let mut options = RenderOptions::default();
    let mut tessellation = TessellationOptions::default();
    let mut overwrite = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => out = Some(PathBuf::from(args.value("--out")?)),
            "--size" => {
                let size = args.parsed("--size")?;
                options.width = size;
                options.height = size;
            }
            "--scale" => options.scale = args.parsed("--scale")?,
            "--slices" => tessellation.slices = args.parsed("--slices")?,
            "--stacks" => tessellation.stacks = args.parsed("--stacks")?,
            "--epoch" => options.epoch = args.parsed("--epoch")?,
            "--overwrite" => overwrite = true,
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
        }
    }
    let out = out.ok_or("render needs --out <image.png>")?;
    if out.exists() && !overwrite {
        return Err(format!(
            "refusing to overwrite existing file {} (use --overwrite)",
            out.display()
        ));
    }
    options.tessellation = tessellation;

    let scene = load_scene(&scene_path)?;
    let engine = Engine::with_scene(scene, options).map_err(|e| e.to_string())?;
    let output = engine.render().map_err(|e| e.to_string())?;
    for skipped in &output.report.skipped {
        eprintln!(
            "skipped primitive {} (`{}`): {}",
            skipped.index, skipped.identifier, skipped.error
        );
    }

    let image = &output.image;
    let buffer = image::GrayImage::from_raw(image.width(), image.height(), image.to_luma8())
        .ok_or("rendered buffer does not match image size")?;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
    }
    buffer
        .save(&out)
        .map_err(|e| format!("write {}: {e}", out.display()))?;

    eprintln!(
        "wrote {} ({}x{}, {} primitives, total flux {:.4})",
        out.display(),
        image.width(),
        image.height(),
        output.report.rendered,
        image.total_flux()
    );
    Ok(())
}

fn load_scene(path: &Path) -> Result<Scene, String> {
    let xml = fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))?;
    persist::from_xml(&xml, registry::models()).map_err(|e| format!("{}: {e}", path.display()))
}

fn available_models() -> String {
    let mut msg = String::from("available primitives:\n");
    for identifier in registry::models().identifiers() {
        msg.push_str("  ");
        msg.push_str(identifier);
        msg.push('\n');
    }
    msg
}

fn write_file(path: &Path, bytes: &[u8], overwrite: bool) -> Result<(), String> {
    if path.exists() && !overwrite {
        return Err(format!(
            "refusing to overwrite existing file {} (use --overwrite)",
            path.display()
        ));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
    }
    fs::write(path, bytes).map_err(|e| format!("write {}: {e}", path.display()))
}

struct Args {
    args: Vec<String>,
    pos: usize,
}

impl Args {
    fn new(args: Vec<String>) -> Self {
        Self { args, pos: 0 }
    }

    fn next(&mut self) -> Option<String> {
        let arg = self.args.get(self.pos)?.clone();
        self.pos += 1;
        Some(arg)
    }

    fn value(&mut self, flag: &str) -> Result<String, String> {
        self.next()
            .ok_or_else(|| format!("missing value for {flag}"))
    }

    fn parsed<T: std::str::FromStr>(&mut self, flag: &str) -> Result<T, String> {
        let raw = self.value(flag)?;
        raw.parse()
            .map_err(|_| format!("invalid value `{raw}` for {flag}"))
    }
}
