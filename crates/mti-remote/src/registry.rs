//! 命令注册表
//!
//! 服务启动前注册完毕，之后只读，所有会话共享同一份。

use mti_driver::HeadingSource;
use mti_protocol::{Command, HEADING_COMMAND, Response};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 命令处理函数
pub type CommandHandler = Box<dyn Fn(&Command) -> Response + Send + Sync>;

/// 命令注册表
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, CommandHandler>,
}

impl CommandRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 只包含 `heading` 命令的注册表
    pub fn with_heading(source: Arc<dyn HeadingSource>) -> Self {
        let mut registry = Self::new();
        registry.register(HEADING_COMMAND, move |_| {
            Response::heading(source.latest_heading())
        });
        registry
    }

    /// 注册命令，同名命令被覆盖
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&Command) -> Response + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    /// 分发命令，未注册的命令返回 `unknown command <name>`
    pub fn dispatch(&self, command: &Command) -> Response {
        match self.handlers.get(&command.name) {
            Some(handler) => handler(command),
            None => Response::unknown_command(&command.name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// 已注册的命令名（排序后）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}
