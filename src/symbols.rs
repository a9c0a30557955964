// src/symbols.rs

use colored::{ColoredString, Colorize};
use std::sync::LazyLock;

// 终端输出的状态前缀
pub static OK: LazyLock<ColoredString> = LazyLock::new(|| "[OK]".green());
pub static INFO: LazyLock<ColoredString> = LazyLock::new(|| "[i]".cyan());
pub static WARN: LazyLock<ColoredString> = LazyLock::new(|| "[!]".yellow());
pub static ERROR: LazyLock<ColoredString> = LazyLock::new(|| "[X]".red());
/// 音频已保存但标签不完整
pub static TAG: LazyLock<ColoredString> = LazyLock::new(|| "[tag]".magenta());
pub static CTRL_C: LazyLock<ColoredString> = LazyLock::new(|| "Ctrl+C".yellow());
