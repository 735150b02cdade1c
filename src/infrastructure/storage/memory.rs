use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

use crate::domain::entity::{DataType, Row, Table, Value};
use crate::domain::repository::{DataSource, StorageError};

/// テーブルのデータを保持する構造体
#[derive(Debug, Clone)]
struct TableData {
    schema: Table,
    rows: Vec<Row>,
    /// 最後に払い出した id
    sequence: i64,
}

impl TableData {
    fn new(schema: Table) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            sequence: 0,
        }
    }

    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    /// 型とNOT NULL制約をチェックし、保存する形に正規化した行を返す
    fn validate_row(&self, row: Row) -> Result<Row, StorageError> {
        if let Some(name) = row.values.keys().find(|name| self.schema.get_column(name).is_none()) {
            return Err(StorageError::ColumnNotFound(name.clone(), self.schema.name.clone()));
        }

        let mut normalized = Row::new();
        for column in &self.schema.columns {
            let value = row.get(&column.name).cloned().unwrap_or(Value::Null);

            if value.is_null() {
                if column.is_not_null() {
                    return Err(StorageError::NotNullViolation(column.name.clone()));
                }
                normalized.set(column.name.clone(), Value::Null);
                continue;
            }

            // 整数は浮動小数点数の列にそのまま格納できる
            let value = match (value, column.data_type) {
                (Value::Integer(i), DataType::Float) => Value::Float(i as f64),
                (value, expected) if value.data_type() != expected => {
                    return Err(StorageError::TypeMismatch {
                        column: column.name.clone(),
                        expected,
                        actual: value.data_type(),
                    });
                }
                (value, _) => value,
            };
            normalized.set(column.name.clone(), value);
        }

        Ok(normalized)
    }

    /// `replacing` の id を持つ既存行は、置き換え対象として比較から外す
    fn check_constraints(&self, row: &Row, replacing: Option<i64>) -> Result<(), StorageError> {
        // プライマリキーと一意制約のチェック
        for column in &self.schema.columns {
            if !(column.is_primary_key() || column.is_unique()) {
                continue;
            }
            let value = match row.get(&column.name) {
                // NULL値はユニーク制約に違反しない（標準SQLの仕様）
                Some(value) if !value.is_null() => value,
                _ => continue,
            };
            let conflict = self
                .rows
                .iter()
                .filter(|existing| replacing.is_none() || existing.id() != replacing)
                .any(|existing| existing.get(&column.name) == Some(value));
            if conflict {
                return Err(if column.is_primary_key() {
                    StorageError::PrimaryKeyViolation(self.schema.name.clone())
                } else {
                    StorageError::UniqueViolation(column.name.clone())
                });
            }
        }

        Ok(())
    }

    fn find(&self, id: i64) -> Option<&Row> {
        self.rows.iter().find(|row| row.id() == Some(id))
    }
}

/// インメモリストレージの実装
///
/// テーブルごとに id の採番列を持ち、主キー・NOT NULL・一意・外部キーの制約を挿入時に検査する。
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<HashMap<String, TableData>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, TableData>>, StorageError> {
        self.tables
            .read()
            .map_err(|e| StorageError::Internal(format!("storage lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, TableData>>, StorageError> {
        self.tables
            .write()
            .map_err(|e| StorageError::Internal(format!("storage lock poisoned: {}", e)))
    }

    /// テーブルを作成する
    pub fn create_table(&self, table: Table, if_not_exists: bool) -> Result<(), StorageError> {
        table
            .validate()
            .map_err(|e| StorageError::Internal(format!("invalid schema for {}: {}", table.name, e)))?;

        let mut tables = self.write()?;
        if tables.contains_key(&table.name) {
            if if_not_exists {
                return Ok(());
            }
            return Err(StorageError::TableAlreadyExists(table.name));
        }

        trace!(table = %table.name, "create table");
        tables.insert(table.name.clone(), TableData::new(table));
        Ok(())
    }

    /// テーブルが存在するか確認する
    pub fn table_exists(&self, table_name: &str) -> Result<bool, StorageError> {
        Ok(self.read()?.contains_key(table_name))
    }

    /// テーブルのスキーマを取得する
    pub fn get_table(&self, table_name: &str) -> Result<Table, StorageError> {
        let tables = self.read()?;
        tables
            .get(table_name)
            .map(|data| data.schema.clone())
            .ok_or_else(|| StorageError::TableNotFound(table_name.to_string()))
    }

    /// すべてのテーブル名を名前順に取得する
    pub fn get_table_names(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// 次の id を払い出す。払い出した id は行が挿入されなくても再利用されない。
    pub fn next_id(&self, table_name: &str) -> Result<i64, StorageError> {
        let mut tables = self.write()?;
        let data = tables
            .get_mut(table_name)
            .ok_or_else(|| StorageError::TableNotFound(table_name.to_string()))?;
        Ok(data.next_id())
    }

    /// 行を挿入し、その行の id を返す。id がなければ採番する。
    pub fn insert_row(&self, table_name: &str, row: Row) -> Result<i64, StorageError> {
        let mut tables = self.write()?;
        Self::insert_into(&mut tables, table_name, row)
    }

    /// 複数行を順に挿入する。途中で失敗した場合、それまでの行は挿入されたまま残る。
    pub fn insert_rows(&self, table_name: &str, rows: Vec<Row>) -> Result<Vec<i64>, StorageError> {
        let mut tables = self.write()?;
        rows.into_iter()
            .map(|row| Self::insert_into(&mut tables, table_name, row))
            .collect()
    }

    fn insert_into(
        tables: &mut HashMap<String, TableData>,
        table_name: &str,
        mut row: Row,
    ) -> Result<i64, StorageError> {
        let data = tables
            .get(table_name)
            .ok_or_else(|| StorageError::TableNotFound(table_name.to_string()))?;

        let id = match row.id() {
            Some(id) => id,
            None => data.sequence + 1,
        };
        row.set("id", id);

        let row = data.validate_row(row)?;
        data.check_constraints(&row, None)?;
        Self::check_references(tables, &data.schema, &row)?;

        let data = tables
            .get_mut(table_name)
            .ok_or_else(|| StorageError::TableNotFound(table_name.to_string()))?;
        data.sequence = data.sequence.max(id);
        data.rows.push(row);
        trace!(table = table_name, id, "insert row");
        Ok(id)
    }

    /// 主キーが同じ既存の行を置き換える
    pub fn update_row(&self, table_name: &str, row: Row) -> Result<(), StorageError> {
        let mut tables = self.write()?;
        Self::update_in(&mut tables, table_name, row)
    }

    fn update_in(
        tables: &mut HashMap<String, TableData>,
        table_name: &str,
        row: Row,
    ) -> Result<(), StorageError> {
        let data = tables
            .get(table_name)
            .ok_or_else(|| StorageError::TableNotFound(table_name.to_string()))?;

        let row = data.validate_row(row)?;
        let id = row
            .id()
            .ok_or_else(|| StorageError::NotNullViolation("id".to_string()))?;
        let position = data
            .rows
            .iter()
            .position(|existing| existing.id() == Some(id))
            .ok_or_else(|| StorageError::RowNotFound {
                table: table_name.to_string(),
                id,
            })?;
        data.check_constraints(&row, Some(id))?;
        Self::check_references(tables, &data.schema, &row)?;

        let data = tables
            .get_mut(table_name)
            .ok_or_else(|| StorageError::TableNotFound(table_name.to_string()))?;
        data.rows[position] = row;
        trace!(table = table_name, id, "update row");
        Ok(())
    }

    /// 外部キーの参照先が存在するか
    fn check_references(
        tables: &HashMap<String, TableData>,
        schema: &Table,
        row: &Row,
    ) -> Result<(), StorageError> {
        for (column, referenced) in schema.foreign_keys() {
            let id = match row.get(&column.name) {
                Some(Value::Integer(id)) => *id,
                _ => continue,
            };
            let target = tables
                .get(referenced)
                .ok_or_else(|| StorageError::TableNotFound(referenced.to_string()))?;
            if target.find(id).is_none() {
                return Err(StorageError::ForeignKeyViolation {
                    column: column.name.clone(),
                    table: referenced.to_string(),
                    id,
                });
            }
        }
        Ok(())
    }

    /// テーブルの全行を挿入順に取得する
    pub fn scan(&self, table_name: &str) -> Result<Vec<Row>, StorageError> {
        let tables = self.read()?;
        tables
            .get(table_name)
            .map(|data| data.rows.clone())
            .ok_or_else(|| StorageError::TableNotFound(table_name.to_string()))
    }

    /// 主キーで1行を取得する
    pub fn find_row(&self, table_name: &str, id: i64) -> Result<Option<Row>, StorageError> {
        let tables = self.read()?;
        let data = tables
            .get(table_name)
            .ok_or_else(|| StorageError::TableNotFound(table_name.to_string()))?;
        Ok(data.find(id).cloned())
    }

    pub fn row_count(&self, table_name: &str) -> Result<usize, StorageError> {
        let tables = self.read()?;
        tables
            .get(table_name)
            .map(|data| data.rows.len())
            .ok_or_else(|| StorageError::TableNotFound(table_name.to_string()))
    }
}

impl DataSource for MemoryStorage {
    fn table(&self, table_name: &str) -> Result<Table, StorageError> {
        self.get_table(table_name)
    }

    fn scan(&self, table_name: &str) -> Result<Vec<Row>, StorageError> {
        MemoryStorage::scan(self, table_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Column;

    fn storage() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage
            .create_table(
                Table {
                    name: "team".to_string(),
                    columns: vec![
                        Column::new("id", DataType::Integer).primary_key(),
                        Column::new("name", DataType::Text).unique(),
                    ],
                },
                false,
            )
            .unwrap();
        storage
            .create_table(
                Table {
                    name: "member".to_string(),
                    columns: vec![
                        Column::new("id", DataType::Integer).primary_key(),
                        Column::new("age", DataType::Integer).not_null(),
                        Column::new("team_id", DataType::Integer).references("team"),
                    ],
                },
                false,
            )
            .unwrap();
        storage
    }

    #[test]
    fn assigns_ids_in_sequence() {
        let storage = storage();
        let first = storage.insert_row("team", Row::new().with("name", "teamA")).unwrap();
        let second = storage.insert_row("team", Row::new().with("name", "teamB")).unwrap();
        assert_eq!((first, second), (1, 2));
        assert_eq!(storage.next_id("team").unwrap(), 3);
        assert_eq!(storage.insert_row("team", Row::new().with("name", "teamC")).unwrap(), 4);
    }

    #[test]
    fn explicit_id_advances_the_sequence() {
        let storage = storage();
        storage.insert_row("team", Row::new().with("id", 10_i64)).unwrap();
        assert_eq!(storage.next_id("team").unwrap(), 11);
        assert_eq!(
            storage.insert_row("team", Row::new().with("id", 10_i64)),
            Err(StorageError::PrimaryKeyViolation("team".to_string()))
        );
    }

    #[test]
    fn rejects_dangling_foreign_key() {
        let storage = storage();
        let result = storage.insert_row("member", Row::new().with("age", 10).with("team_id", 7_i64));
        assert_eq!(
            result,
            Err(StorageError::ForeignKeyViolation {
                column: "team_id".to_string(),
                table: "team".to_string(),
                id: 7,
            })
        );

        let team = storage.insert_row("team", Row::new().with("name", "teamA")).unwrap();
        assert!(storage
            .insert_row("member", Row::new().with("age", 10).with("team_id", team))
            .is_ok());
        // NULL の外部キーは参照を持たない
        assert!(storage
            .insert_row("member", Row::new().with("age", 20).with("team_id", Value::Null))
            .is_ok());
    }

    #[test]
    fn checks_types_and_not_null() {
        let storage = storage();
        assert_eq!(
            storage.insert_row("member", Row::new().with("age", "ten")),
            Err(StorageError::TypeMismatch {
                column: "age".to_string(),
                expected: DataType::Integer,
                actual: DataType::Text,
            })
        );
        assert_eq!(
            storage.insert_row("member", Row::new()),
            Err(StorageError::NotNullViolation("age".to_string()))
        );
        assert_eq!(
            storage.insert_row("member", Row::new().with("age", 1).with("nickname", "x")),
            Err(StorageError::ColumnNotFound("nickname".to_string(), "member".to_string()))
        );
    }

    #[test]
    fn unique_ignores_null() {
        let storage = storage();
        storage.insert_row("team", Row::new()).unwrap();
        storage.insert_row("team", Row::new()).unwrap();
        storage.insert_row("team", Row::new().with("name", "teamA")).unwrap();
        assert_eq!(
            storage.insert_row("team", Row::new().with("name", "teamA")),
            Err(StorageError::UniqueViolation("name".to_string()))
        );
    }

    #[test]
    fn scan_keeps_insertion_order_and_fills_nulls() {
        let storage = storage();
        storage.insert_rows("team", vec![Row::new().with("name", "b"), Row::new().with("name", "a")]).unwrap();
        let rows = storage.scan("team").unwrap();
        assert_eq!(rows.iter().map(|r| r.id()).collect::<Vec<_>>(), vec![Some(1), Some(2)]);
        assert_eq!(storage.find_row("team", 2).unwrap().and_then(|r| r.get("name").cloned()), Some(Value::from("a")));
        assert_eq!(storage.get_table_names().unwrap(), vec!["member", "team"]);
        assert!(matches!(storage.scan("order"), Err(StorageError::TableNotFound(_))));
    }

    #[test]
    fn update_replaces_row_with_same_id() {
        let storage = storage();
        storage.insert_row("team", Row::new().with("name", "teamA")).unwrap();
        storage.insert_row("team", Row::new().with("name", "teamB")).unwrap();

        // 自分自身の値とは一意制約で衝突しない
        storage.update_row("team", Row::new().with("id", 1_i64).with("name", "teamA")).unwrap();
        storage.update_row("team", Row::new().with("id", 1_i64).with("name", "teamC")).unwrap();
        assert_eq!(storage.row_count("team").unwrap(), 2);
        assert_eq!(
            storage.find_row("team", 1).unwrap().and_then(|r| r.get("name").cloned()),
            Some(Value::from("teamC"))
        );

        assert_eq!(
            storage.update_row("team", Row::new().with("id", 1_i64).with("name", "teamB")),
            Err(StorageError::UniqueViolation("name".to_string()))
        );
        assert_eq!(
            storage.update_row("team", Row::new().with("id", 9_i64)),
            Err(StorageError::RowNotFound { table: "team".to_string(), id: 9 })
        );
    }
}
