// ==========================================
// 音乐学院管理后台 - 文档集合接口
// ==========================================
// 职责: 定义文档集合能力 (find/findOne/insertOne/updateOne/
//       findOneAndUpdate/deleteOne) 及过滤/更新表达式
// 更新操作: $set（点路径，含数组下标）/ $push / $pull
// 红线: 不含业务逻辑
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use serde::Serialize;
use serde_json::{Map, Value};

/// 文档主键字段
pub const ID_FIELD: &str = "_id";

// ==========================================
// Filter - 等值过滤条件（合取）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// 空过滤条件（匹配全部文档）
    pub fn new() -> Self {
        Self::default()
    }

    /// 按主键过滤
    pub fn by_id(id: &str) -> Self {
        Self::new().eq(ID_FIELD, id)
    }

    /// 追加等值条件
    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((path.into(), value.into()));
        self
    }

    /// 主键条件（若存在）
    pub fn id(&self) -> Option<&str> {
        self.conditions
            .iter()
            .find(|(path, _)| path == ID_FIELD)
            .and_then(|(_, value)| value.as_str())
    }

    /// 判断文档是否满足全部条件
    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(path, expected)| get_path(doc, path) == Some(expected))
    }
}

// ==========================================
// Update - 更新表达式
// ==========================================
#[derive(Debug, Clone, PartialEq)]
enum UpdateOp {
    /// $set: 写入字段（自动创建中间对象）
    Set { path: String, value: Value },
    /// $push: 追加到数组（数组不存在时创建）
    Push { path: String, value: Value },
    /// $pull: 删除数组中 `key == value` 的元素
    Pull { path: String, key: String, value: Value },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    /// 序列化后写入字段
    pub fn set_serialized<T: Serialize>(self, path: impl Into<String>, value: &T) -> RepositoryResult<Self> {
        let value = serde_json::to_value(value)?;
        Ok(self.set(path, value))
    }

    pub fn push(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Push {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn pull(mut self, path: impl Into<String>, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Pull {
            path: path.into(),
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// 将更新应用到文档（原地修改）
    ///
    /// # 返回
    /// - Ok(true): 文档内容发生变化
    /// - Ok(false): 无变化
    /// - Err: 路径无法写入（例如穿过标量字段）
    pub fn apply(&self, doc: &mut Value) -> RepositoryResult<bool> {
        let before = doc.clone();
        for op in &self.ops {
            match op {
                UpdateOp::Set { path, value } => {
                    check_not_id(path)?;
                    let (parent, last) = resolve_parent(doc, path)?;
                    assign(parent, last, value.clone(), path)?;
                }
                UpdateOp::Push { path, value } => {
                    let (parent, last) = resolve_parent(doc, path)?;
                    let target = child_or_create(parent, last, path, || Value::Array(Vec::new()))?;
                    match target {
                        Value::Array(items) => items.push(value.clone()),
                        _ => return Err(field_error(path, "$push target is not an array")),
                    }
                }
                UpdateOp::Pull { path, key, value } => match get_path_mut(doc, path) {
                    Some(Value::Array(items)) => {
                        items.retain(|item| item.get(key.as_str()) != Some(value));
                    }
                    Some(Value::Null) | None => {}
                    Some(_) => return Err(field_error(path, "$pull target is not an array")),
                },
            }
        }
        Ok(*doc != before)
    }
}

/// 写回结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateAck {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// 删除结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteAck {
    pub deleted_count: u64,
}

/// findOneAndUpdate 返回更新前还是更新后的文档
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnDocument {
    Before,
    #[default]
    After,
}

// ==========================================
// Trait: DocumentCollection
// ==========================================
/// 文档集合能力
///
/// 文档为带 `_id` 字符串主键的 JSON 对象。
pub trait DocumentCollection: Send + Sync {
    /// 查询全部匹配文档（按插入顺序）
    fn find(&self, filter: &Filter) -> RepositoryResult<Vec<Value>>;

    /// 查询首个匹配文档
    fn find_one(&self, filter: &Filter) -> RepositoryResult<Option<Value>>;

    /// 插入文档，返回主键（缺省时生成 UUID）
    fn insert_one(&self, doc: Value) -> RepositoryResult<String>;

    /// 更新首个匹配文档
    fn update_one(&self, filter: &Filter, update: &Update) -> RepositoryResult<UpdateAck>;

    /// 更新首个匹配文档并返回更新前/后的内容；未匹配时返回 None
    fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        return_document: ReturnDocument,
    ) -> RepositoryResult<Option<Value>>;

    /// 删除首个匹配文档
    fn delete_one(&self, filter: &Filter) -> RepositoryResult<DeleteAck>;
}

// ==========================================
// 路径辅助函数
// ==========================================

fn field_error(path: &str, message: &str) -> RepositoryError {
    RepositoryError::FieldValueError {
        field: path.to_string(),
        message: message.to_string(),
    }
}

fn check_not_id(path: &str) -> RepositoryResult<()> {
    if path == ID_FIELD {
        return Err(field_error(path, "_id is immutable"));
    }
    Ok(())
}

/// 按点路径读取字段
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn get_path_mut<'a>(doc: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.').try_fold(doc, |node, segment| match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    })
}

/// 定位父节点（中间对象按需创建）
fn resolve_parent<'a, 'p>(doc: &'a mut Value, path: &'p str) -> RepositoryResult<(&'a mut Value, &'p str)> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments
        .pop()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| field_error(path, "empty path"))?;

    let mut node = doc;
    for segment in segments {
        node = child_or_create(node, segment, path, || Value::Object(Map::new()))?;
    }
    Ok((node, last))
}

fn child_or_create<'a>(
    node: &'a mut Value,
    segment: &str,
    path: &str,
    make: impl FnOnce() -> Value,
) -> RepositoryResult<&'a mut Value> {
    match node {
        Value::Object(map) => {
            let child = map.entry(segment.to_string()).or_insert(Value::Null);
            if child.is_null() {
                *child = make();
            }
            Ok(child)
        }
        Value::Array(items) => {
            let index: usize = segment
                .parse()
                .map_err(|_| field_error(path, "array segment must be an index"))?;
            items
                .get_mut(index)
                .ok_or_else(|| field_error(path, "array index out of bounds"))
        }
        _ => Err(field_error(path, "cannot traverse into a scalar field")),
    }
}

fn assign(parent: &mut Value, key: &str, value: Value, path: &str) -> RepositoryResult<()> {
    match parent {
        Value::Object(map) => {
            map.insert(key.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index: usize = key
                .parse()
                .map_err(|_| field_error(path, "array segment must be an index"))?;
            let slot = items
                .get_mut(index)
                .ok_or_else(|| field_error(path, "array index out of bounds"))?;
            *slot = value;
            Ok(())
        }
        _ => Err(field_error(path, "cannot assign into a scalar field")),
    }
}
