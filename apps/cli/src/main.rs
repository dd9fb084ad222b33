//! # MTi CLI
//!
//! 航向传感器命令行工具。
//!
//! ```bash
//! # 绑定（仿真）设备并在 4444 端口提供航向
//! mti-cli serve --port 4444 --device /dev/ttyUSB0 --device-id 02782090
//!
//! # 另一个终端：每秒读取一次远程航向
//! mti-cli watch --addr localhost:4444
//!
//! # 进程内直接读取
//! mti-cli read
//!
//! # 检查合并后的配置
//! mti-cli check-config --config ./mti.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod utils;

use commands::{CheckConfigCommand, ReadCommand, ServeCommand, WatchCommand};

/// MTi CLI - 航向传感器命令行工具
#[derive(Parser, Debug)]
#[command(name = "mti-cli")]
#[command(about = "Serve and read Xsens MTi heading sensors", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 绑定设备并通过 TCP 提供航向
    Serve {
        #[command(flatten)]
        args: ServeCommand,
    },

    /// 连接服务端并周期性读取航向
    Watch {
        #[command(flatten)]
        args: WatchCommand,
    },

    /// 进程内绑定设备并持续打印航向
    Read {
        #[command(flatten)]
        args: ReadCommand,
    },

    /// 校验并打印合并后的配置
    CheckConfig {
        #[command(flatten)]
        args: CheckConfigCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mti_cli=info".parse()?)
                .add_directive("mti_driver=info".parse()?)
                .add_directive("mti_remote=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { args } => {
            let shutdown = utils::install_shutdown_handler()?;
            args.execute(&shutdown)
        },

        Commands::Watch { args } => {
            let shutdown = utils::install_shutdown_handler()?;
            args.execute(&shutdown)
        },

        Commands::Read { args } => {
            let shutdown = utils::install_shutdown_handler()?;
            args.execute(&shutdown)
        },

        Commands::CheckConfig { args } => args.execute(),
    }
}
