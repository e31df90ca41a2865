use std::io::Write;

/// 以 Info 级别初始化日志
pub fn init_log() {
    init_log_with_level(log::LevelFilter::Info);
}

/// 初始化带颜色的日志输出
///
/// `RUST_LOG` 环境变量会覆盖 `level`。重复调用是安全的，只有第一次生效。
pub fn init_log_with_level(level: log::LevelFilter) {
    let result = env_logger::Builder::new()
        .format(|buf, record| {
            let info_style = buf
                .default_level_style(log::Level::Info)
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green)));
            let warn_style = buf
                .default_level_style(log::Level::Warn)
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow)));
            let error_style = buf
                .default_level_style(log::Level::Error)
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red)));

            let level_style = match record.level() {
                log::Level::Info => info_style,
                log::Level::Warn => warn_style,
                log::Level::Error => error_style,
                _ => buf.default_level_style(record.level()),
            };
            let grey_style = info_style.fg_color(Some(anstyle::Color::Rgb(anstyle::RgbColor(110, 110, 110))));

            let line = record.line().unwrap_or(!0);
            let file = record.file().unwrap_or("").rsplit(['\\', '/']).next().unwrap_or("");
            let time = chrono::Local::now().format("%H:%M:%S%.3f");
            let level = record.level();

            writeln!(
                buf,
                "{level_style}[{time}] {level}{level_style:#} {grey_style}[{file}:{line}]{grey_style:#} {}",
                record.args()
            )
        })
        .filter(None, level)
        .parse_default_env()
        .try_init();

    if result.is_err() {
        log::debug!("logger already initialized, keep the existing one");
    }
}
