//! Scratch Space - 请求级临时目录
//!
//! 每个进行中的请求独占一个唯一命名的目录，上传样本和中间波形都放在里面，
//! 句柄 drop 时整个目录被删除（成功、失败、超时取消均如此）

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// 临时目录根
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    /// 创建临时目录根（不存在则创建）
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 为一个请求分配临时目录
    pub fn request(&self) -> io::Result<RequestScratch> {
        let id = Uuid::new_v4();
        let dir = tempfile::Builder::new()
            .prefix(&format!("req-{}-", id))
            .tempdir_in(&self.root)?;

        tracing::trace!(request_id = %id, dir = %dir.path().display(), "Scratch allocated");

        Ok(RequestScratch { id, dir })
    }
}

/// 单个请求的临时目录句柄
#[derive(Debug)]
pub struct RequestScratch {
    id: Uuid,
    dir: TempDir,
}

impl RequestScratch {
    /// 请求标识（用于日志关联）
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// 目录内文件路径
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(file_name)
    }
}

impl Drop for RequestScratch {
    fn drop(&mut self) {
        tracing::trace!(request_id = %self.id, "Scratch released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_request_dirs_are_unique_and_released() {
        let root = tempdir().unwrap();
        let space = ScratchSpace::new(root.path().join("tmp")).unwrap();

        let first = space.request().unwrap();
        let second = space.request().unwrap();
        assert_ne!(first.id(), second.id());
        assert_ne!(first.dir(), second.dir());

        std::fs::write(first.path("base.wav"), b"data").unwrap();
        let first_dir = first.dir().to_path_buf();
        drop(first);
        assert!(!first_dir.exists());
        assert!(second.dir().exists());

        drop(second);
        assert_eq!(std::fs::read_dir(space.root()).unwrap().count(), 0);
    }
}
