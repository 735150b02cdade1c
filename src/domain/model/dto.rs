use serde::{Deserialize, Serialize};

use crate::domain::entity::{DataType, Value, ValueError};
use crate::domain::query::{Arguments, Bean, FromArguments, ValueType};

/// 会員の検索結果DTO
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberDto {
    pub username: Option<String>,
    pub age: i32,
}

impl MemberDto {
    pub fn new(username: Option<String>, age: i32) -> Self {
        Self { username, age }
    }
}

impl FromArguments for MemberDto {
    fn parameter_types() -> Vec<DataType> {
        vec![DataType::Text, DataType::Integer]
    }

    fn from_arguments(arguments: &mut Arguments) -> Result<Self, ValueError> {
        Ok(Self::new(arguments.next()?, arguments.required()?))
    }
}

impl Bean for MemberDto {
    fn set_property(&mut self, name: &str, value: Value) -> Result<bool, ValueError> {
        match name {
            "username" => self.username = String::from_value(&value)?,
            "age" => self.age = i32::from_value(&value)?.ok_or(ValueError::NullValueNotAllowed)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// 会員名を `name` で公開するDTO。別名 (`as_("name")`) の確認用。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDto {
    pub name: Option<String>,
    pub age: i32,
}

impl UserDto {
    pub fn new(name: Option<String>, age: i32) -> Self {
        Self { name, age }
    }
}

impl FromArguments for UserDto {
    fn parameter_types() -> Vec<DataType> {
        vec![DataType::Text, DataType::Integer]
    }

    fn from_arguments(arguments: &mut Arguments) -> Result<Self, ValueError> {
        Ok(Self::new(arguments.next()?, arguments.required()?))
    }
}

impl Bean for UserDto {
    fn set_property(&mut self, name: &str, value: Value) -> Result<bool, ValueError> {
        match name {
            "name" => self.name = String::from_value(&value)?,
            "age" => self.age = i32::from_value(&value)?.ok_or(ValueError::NullValueNotAllowed)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_and_setters_agree() {
        let mut arguments = Arguments::new(vec![Value::from("member1"), Value::Integer(10)]);
        let by_constructor = MemberDto::from_arguments(&mut arguments).unwrap();

        let mut by_setter = MemberDto::default();
        assert!(by_setter.set_property("username", Value::from("member1")).unwrap());
        assert!(by_setter.set_property("age", Value::Integer(10)).unwrap());
        assert!(!by_setter.set_property("nickname", Value::Null).unwrap());

        assert_eq!(by_constructor, by_setter);
    }

    #[test]
    fn null_age_is_rejected() {
        let mut arguments = Arguments::new(vec![Value::Null, Value::Null]);
        assert_eq!(
            UserDto::from_arguments(&mut arguments),
            Err(ValueError::NullValueNotAllowed)
        );
    }
}
