//! 命令行工具依赖的通用组件.

use log::LevelFilter;
use simple_logger::SimpleLogger;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 由命令行的 `-v` 次数与 `-q` 决定日志级别.
///
/// 默认为 `info`, 以便看到缺少可选输入时的提示. `-q` 降为 `warn`;
/// `-v` 升为 `debug`, `-vv` 及以上为 `trace`.
pub fn log_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Warn;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// 安装全局 logger. 只能调用一次.
pub fn init_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    SimpleLogger::new()
        .with_level(level)
        .without_timestamps()
        .init()
}
