//! 波前并行 (WPP) 的上下文快照.
//!
//! 每行第一个 CTU 解码完成后保存熵解码上下文, 下一行开头若上方 CTU
//! 可用则从快照恢复. 快照是普通值类型, 在一次 `decode_slice` 内有效.

use vslice_core::{VsliceError, VsliceResult};

use crate::engine::EntropyDecoder;

/// 上下文快照缓存
#[derive(Debug, Clone)]
pub struct ContextCache<C: Clone> {
    saved: Option<C>,
}

impl<C: Clone> Default for ContextCache<C> {
    fn default() -> Self {
        Self { saved: None }
    }
}

impl<C: Clone> ContextCache<C> {
    /// 创建空缓存
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存引擎当前的上下文, 覆盖旧快照
    pub fn save<E>(&mut self, engine: &E)
    where
        E: EntropyDecoder<ContextState = C> + ?Sized,
    {
        self.saved = Some(engine.context_state());
    }

    /// 把快照恢复到引擎, 快照本身保留
    pub fn restore<E>(&self, engine: &mut E) -> VsliceResult<()>
    where
        E: EntropyDecoder<ContextState = C> + ?Sized,
    {
        let state = self
            .saved
            .clone()
            .ok_or_else(|| VsliceError::Internal("恢复上下文时没有可用快照".into()))?;
        engine.set_context_state(state);
        Ok(())
    }

    /// 是否尚未保存快照
    pub fn is_empty(&self) -> bool {
        self.saved.is_none()
    }

    /// 丢弃快照
    pub fn clear(&mut self) {
        self.saved = None;
    }

    /// 快照内容
    pub fn saved(&self) -> Option<&C> {
        self.saved.as_ref()
    }
}
