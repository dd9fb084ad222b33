//! Compass 驱动对外 API
//!
//! 一个 [`Compass`] 独占一个已进入测量模式的设备控制器，后台 IO 线程持续
//! 采样并把最新航向角写入共享缓存。

use crate::error::DriverError;
use crate::lifecycle::{AtomicLifecycleState, LifecycleState};
use crate::metrics::{DriverMetrics, DriverMetricsSnapshot};
use crate::pipeline::{IngestionConfig, ingestion_loop};
use crate::sensor::{HeadingSensor, SensorProperties};
use crate::state::{HeadingCache, HeadingSource, HeadingState};
use crossbeam_channel::Sender;
use mti_device::{DeviceController, DeviceHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{Span, debug, error, info, trace};

/// 默认的 IO 线程 join 超时
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// 带超时的线程 join，成功时返回线程的返回值
trait JoinTimeout<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<T>;
}

impl<T: Send + 'static> JoinTimeout<T> for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<T> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // 看门狗线程负责真正的 join
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // 超时后看门狗线程继续等待，进程退出时由 OS 回收
                Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "Thread join timeout",
                )))
            },
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 已进入测量模式的控制器
///
/// Drop 时注销数据包回调并销毁控制器。IO 线程正常退出、panic 展开，
/// 以及线程没能创建（闭包被直接 drop）都经过这里，释放恰好发生一次。
struct ArmedController {
    controller: Box<dyn DeviceController>,
}

impl Drop for ArmedController {
    fn drop(&mut self) {
        self.controller.remove_packet_callback();
        self.controller.destruct();
        debug!("controller released");
    }
}

/// 需要在关闭时串行处理的资源
struct Lifecycle {
    /// 停止信号发送端，drop 即通知 IO 线程退出
    stop_tx: Option<Sender<()>>,
    /// IO 线程，退出前释放控制器
    io_thread: Option<JoinHandle<()>>,
}

/// MTi 航向传感器驱动
///
/// - `heading()` 无锁读取缓存，任意线程可调用
/// - `close()` 幂等，可以并发调用，只有第一次真正释放资源
/// - Drop 时自动关闭
///
/// # Example
///
/// ```no_run
/// # use mti_device::DeviceController;
/// # fn controller() -> Box<dyn DeviceController> { unimplemented!() }
/// use mti_driver::CompassBuilder;
///
/// let compass = CompassBuilder::new("02782090", "/dev/ttyUSB0")
///     .build(controller())
///     .unwrap();
///
/// let heading = compass.heading();
/// if heading.is_nan() {
///     println!("heading unknown");
/// }
/// compass.close().unwrap();
/// ```
pub struct Compass {
    device: DeviceHandle,
    cache: Arc<HeadingCache>,
    metrics: Arc<DriverMetrics>,
    state: AtomicLifecycleState,
    lifecycle: Mutex<Lifecycle>,
    join_timeout: Duration,
    span: Span,
}

impl Compass {
    /// 启动 IO 线程
    ///
    /// `controller` 必须已经进入测量模式。IO 线程拥有控制器，循环退出后释放它；
    /// 线程创建失败时控制器随闭包一起被 drop，同样会被释放。
    pub(crate) fn spawn(
        controller: Box<dyn DeviceController>,
        device: DeviceHandle,
        config: IngestionConfig,
        join_timeout: Duration,
        span: Span,
    ) -> Result<Self, DriverError> {
        let cache = Arc::new(HeadingCache::new());
        let metrics = Arc::new(DriverMetrics::new());
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let armed = ArmedController { controller };
        let cache_clone = cache.clone();
        let metrics_clone = metrics.clone();
        let thread_span = span.clone();
        let io_thread = std::thread::Builder::new()
            .name(format!("mti-ingest-{}", device.device_id))
            .spawn(move || {
                let _entered = thread_span.enter();
                // 在 span 内 drop，释放日志归属到这个驱动
                let mut armed = armed;
                ingestion_loop(
                    &mut armed.controller,
                    stop_rx,
                    &cache_clone,
                    &metrics_clone,
                    &config,
                );
            })
            .map_err(|e| {
                DriverError::IoThread(format!("failed to spawn ingestion thread: {}", e))
            })?;

        let state = AtomicLifecycleState::new(LifecycleState::Created);
        state.advance(LifecycleState::Running);

        {
            let _enter = span.enter();
            info!(port = %device.port, baud_rate = %device.baud_rate, "compass running");
        }

        Ok(Self {
            device,
            cache,
            metrics,
            state,
            lifecycle: Mutex::new(Lifecycle {
                stop_tx: Some(stop_tx),
                io_thread: Some(io_thread),
            }),
            join_timeout,
            span,
        })
    }

    /// 最新航向角（度），尚未收到有效数据时为 NaN
    ///
    /// 非阻塞，关闭后仍返回最后一次的有效值。
    pub fn heading(&self) -> f64 {
        self.cache.load()
    }

    /// 航向角及其更新时间
    pub fn heading_state(&self) -> HeadingState {
        self.cache.snapshot()
    }

    /// 共享航向缓存（供远程服务等只读方使用）
    pub fn heading_cache(&self) -> Arc<HeadingCache> {
        self.cache.clone()
    }

    /// 已绑定的设备
    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    /// 采样指标快照
    pub fn metrics(&self) -> DriverMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// IO 线程是否仍在运行
    pub fn is_running(&self) -> bool {
        if !self.state.get().is_running() {
            return false;
        }
        self.lifecycle
            .lock()
            .io_thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// 关闭驱动
    ///
    /// 通知 IO 线程退出并等待。IO 线程在退出前注销数据包回调、销毁控制器，
    /// 所以 `Ok(())` 返回时设备已经释放。
    /// 重复调用（包括并发调用）直接返回 `Ok(())`。
    ///
    /// IO 线程在超时内没有退出或 panic 时返回 [`DriverError::IoThread`]，
    /// 驱动仍然进入 Closed 状态；迟到的 IO 线程在循环结束时照常释放控制器。
    pub fn close(&self) -> Result<(), DriverError> {
        let _enter = self.span.enter();
        let mut lifecycle = self.lifecycle.lock();

        if self.state.get().is_closed() {
            trace!("compass already closed");
            return Ok(());
        }

        // 必须先 drop 发送端，IO 线程才能看到通道断开
        drop(lifecycle.stop_tx.take());

        let mut result = Ok(());
        if let Some(handle) = lifecycle.io_thread.take() {
            match handle.join_timeout(self.join_timeout) {
                Ok(()) => {},
                Err(_e) => {
                    error!(
                        "Ingestion thread panicked or failed to shut down within {:?}",
                        self.join_timeout
                    );
                    result = Err(DriverError::IoThread(
                        "ingestion thread did not shut down cleanly".to_string(),
                    ));
                },
            }
        }

        self.state.advance(LifecycleState::Closed);
        info!("compass closed");
        result
    }
}

impl HeadingSource for Compass {
    fn latest_heading(&self) -> f64 {
        self.heading()
    }
}

impl HeadingSensor for Compass {
    type Error = DriverError;

    fn heading(&self) -> Result<f64, DriverError> {
        Ok(Compass::heading(self))
    }

    fn start_calibration(&self) -> Result<(), DriverError> {
        trace!("start_calibration is a no-op for MTi");
        Ok(())
    }

    fn stop_calibration(&self) -> Result<(), DriverError> {
        trace!("stop_calibration is a no-op for MTi");
        Ok(())
    }

    fn properties(&self) -> SensorProperties {
        SensorProperties {
            compass_heading_supported: true,
        }
    }

    fn close(&self) -> Result<(), DriverError> {
        Compass::close(self)
    }
}

impl std::fmt::Debug for Compass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compass")
            .field("device", &self.device)
            .field("state", &self.state.get())
            .field("heading", &self.cache.load())
            .finish_non_exhaustive()
    }
}

impl Drop for Compass {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Failed to close compass on drop: {}", e);
        }
    }
}
