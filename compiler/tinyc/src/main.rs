use std::any::Any;
use std::ffi::CStr;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser as ClapParser;
use tinyc_ast::FuncOrigin;
use tinyc_vm::{DataCell, HostRegistry, LoadedProgram, RawPtr, Vm};
use tracing::debug;

/// Bit 0 of `--libs`: the core library (`prints`, `printf`, `printp`,
/// `malloc`, `tan`, `sqrt`, `pow`, `exit`), mirroring the reference VM's
/// `_core_lib` host-function table.
const LIB_CORE: u32 = 1 << 0;

type HostFn = fn(&[DataCell], &mut dyn Any) -> DataCell;

/// Prototype and Rust implementation of one host function. Kept as one
/// table so the parser's pre-registration pass and the VM's runtime
/// registry are built from the same source and can never drift apart.
const CORE_LIB: &[(&str, HostFn)] = &[
    ("void prints(const s8*)", host_prints),
    ("void printf(f64)", host_printf),
    ("void printp(const void*)", host_printp),
    ("void* malloc(s32)", host_malloc),
    ("f64 tan(f64)", host_tan),
    ("f64 sqrt(f64)", host_sqrt),
    ("f64 pow(f64, f64)", host_pow),
    ("void exit()", host_exit),
];

#[derive(clap::Parser)]
#[command(name = "tinyc", about = "Compiles and runs a tinyc source file")]
struct Args {
    /// Source file to compile and run.
    source: PathBuf,

    /// Bitmask of host libraries to link against (bit 0 = core library).
    #[arg(long, default_value_t = LIB_CORE)]
    libs: u32,

    /// Log filter forwarded to `tracing_subscriber`'s `EnvFilter`, e.g.
    /// "debug" or "tinyc_codegen=trace". Falls back to `TINYC_FILTER` or
    /// `info` when unset.
    #[arg(long)]
    log: Option<String>,
}

fn main() {
    let args = Args::parse();
    init_logger(args.log.as_deref());

    match run(&args) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(err) => {
            eprintln!("tinyc: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> anyhow::Result<i32> {
    let source =
        std::fs::read_to_string(&args.source).with_context(|| format!("reading '{}'", args.source.display()))?;

    let host_prototypes: Vec<(&str, FuncOrigin)> = if args.libs & LIB_CORE != 0 {
        CORE_LIB.iter().map(|(prototype, _)| (*prototype, FuncOrigin::CoreLib)).collect()
    } else {
        Vec::new()
    };

    let parsed =
        tinyc_parser::parse_program(&source, &host_prototypes).map_err(|e| anyhow!(e.render(&source)))?;
    debug!(functions = parsed.funcs.len(), globals = parsed.globals.len(), "parsed");

    let program = tinyc_codegen::assemble_program(&parsed.structs, &parsed.funcs, &parsed.globals)
        .map_err(|e| anyhow!("{e}"))?;
    let bytes = tinyc_codegen::serialize(&program);
    debug!(bytes = bytes.len(), "assembled program");

    let mut hosts = HostRegistry::new();
    if args.libs & LIB_CORE != 0 {
        for (prototype, callback) in CORE_LIB.iter().copied() {
            hosts.register(prototype, callback);
        }
    }

    let loaded = LoadedProgram::load(&bytes, &hosts).map_err(|e| anyhow!("{e}"))?;

    let mut vm = Vm::new();
    let mut host_state = HostState::default();
    let exit_code = vm.run(&loaded, &mut host_state).map_err(|e| anyhow!("{e}"))?;
    Ok(exit_code)
}

/// Backing storage for pointers the core library hands out. `malloc`'s
/// buffers live here for the rest of the run; the VM itself never tracks
/// or frees host allocations.
#[derive(Default)]
struct HostState {
    allocations: Vec<Box<[u8]>>,
}

fn host_prints(argv: &[DataCell], _host_data: &mut dyn Any) -> DataCell {
    let ptr = argv[0].pointer();
    if !ptr.is_null() {
        let c_str = unsafe { CStr::from_ptr(ptr.0 as *const i8) };
        print!("{}", c_str.to_string_lossy());
    }
    DataCell::zeroed()
}

fn host_printf(argv: &[DataCell], _host_data: &mut dyn Any) -> DataCell {
    print!("{}", argv[0].f64());
    DataCell::zeroed()
}

fn host_printp(argv: &[DataCell], _host_data: &mut dyn Any) -> DataCell {
    print!("{:p}", argv[0].pointer().0);
    DataCell::zeroed()
}

fn host_malloc(argv: &[DataCell], host_data: &mut dyn Any) -> DataCell {
    let size = argv[0].s32().max(0) as usize;
    let state = host_data.downcast_mut::<HostState>().expect("tinyc's own host state");
    let mut buf = vec![0u8; size].into_boxed_slice();
    let ptr = buf.as_mut_ptr();
    state.allocations.push(buf);
    DataCell::from_pointer(RawPtr(ptr))
}

fn host_tan(argv: &[DataCell], _host_data: &mut dyn Any) -> DataCell {
    DataCell::from_f64(argv[0].f64().tan())
}

fn host_sqrt(argv: &[DataCell], _host_data: &mut dyn Any) -> DataCell {
    DataCell::from_f64(argv[0].f64().sqrt())
}

fn host_pow(argv: &[DataCell], _host_data: &mut dyn Any) -> DataCell {
    DataCell::from_f64(argv[0].f64().powf(argv[1].f64()))
}

fn host_exit(_argv: &[DataCell], _host_data: &mut dyn Any) -> DataCell {
    std::process::exit(0);
}

fn init_logger(log: Option<&str>) {
    if let Some(filter) = log {
        std::env::set_var("TINYC_FILTER", filter);
    }
    if let Err(err) = tinyc_log::Logger::init_logger(tinyc_log::LoggerConfig::from_env("TINYC").unwrap()) {
        eprintln!("tinyc: failed to initialize logging: {err}");
    }
}
