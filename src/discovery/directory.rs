//! 实例目录
//!
//! 服务名 -> 有序实例列表。服务首次注册后才存在，之后每次注册整体替换，不单独删除。

use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;

/// 一次替换的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swapped<I> {
    /// 替换前的实例列表，`None` 表示首次注册
    pub previous: Option<Vec<I>>,
    /// 替换后的版本号（同一服务内单调递增）
    pub generation: u64,
}

struct DirectoryEntry<I> {
    instances: Vec<I>,
    generation: u64,
}

/// 内存实例目录
///
/// 所有操作都在目录锁内完成，锁不会跨越任何网络调用
pub struct InstanceDirectory<S, I> {
    entries: Mutex<HashMap<S, DirectoryEntry<I>>>,
}

impl<S, I> InstanceDirectory<S, I>
where
    S: Eq + Hash,
    I: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// 使用初始映射创建目录（初始条目版本号为 0）
    pub fn with_instances(instances: HashMap<S, Vec<I>>) -> Self {
        let entries = instances
            .into_iter()
            .map(|(service, instances)| {
                (
                    service,
                    DirectoryEntry {
                        instances,
                        generation: 0,
                    },
                )
            })
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// 读取服务的实例列表
    pub fn get(&self, service: &S) -> Option<Vec<I>> {
        self.entries
            .lock()
            .get(service)
            .map(|entry| entry.instances.clone())
    }

    /// 替换服务的实例列表，返回旧值
    pub fn set(&self, service: S, instances: Vec<I>) -> Option<Vec<I>> {
        self.swap(service, instances).previous
    }

    /// 替换服务的实例列表，返回旧值和新版本号
    pub fn swap(&self, service: S, instances: Vec<I>) -> Swapped<I> {
        let mut entries = self.entries.lock();
        match entries.entry(service) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.generation += 1;
                let previous = std::mem::replace(&mut entry.instances, instances);
                Swapped {
                    previous: Some(previous),
                    generation: entry.generation,
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(DirectoryEntry {
                    instances,
                    generation: 1,
                });
                Swapped {
                    previous: None,
                    generation: 1,
                }
            }
        }
    }

    pub fn contains(&self, service: &S) -> bool {
        self.entries.lock().contains_key(service)
    }

    /// 已注册的服务数量
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<S, I> Default for InstanceDirectory<S, I>
where
    S: Eq + Hash,
    I: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
