//! Dependency declarations as written in a manifest's `dependencies` list.
//!
//! A declaration reads `[flag] name [comparator version]`, for example
//! `"? flib >= 0.16.3"`. Rewrites always keep the leading flag.
use crate::version::ModVersion;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const DEPENDENCY_PATTERN: &str =
    r"^\s*(\(\?\)|[!?~])?\s*([A-Za-z0-9_-]+)(?:\s*(>=|<=|==|~>|=|<|>)\s*([0-9][0-9.]*))?\s*$";

fn dependency_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(DEPENDENCY_PATTERN).expect("dependency pattern compiles"))
}

/// Leading marker on a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyFlag {
    /// `!`
    Incompatible,
    /// `?`
    Optional,
    /// `(?)`
    HiddenOptional,
    /// `~`
    NoLoadOrder,
}

impl DependencyFlag {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "!" => Some(Self::Incompatible),
            "?" => Some(Self::Optional),
            "(?)" => Some(Self::HiddenOptional),
            "~" => Some(Self::NoLoadOrder),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incompatible => "!",
            Self::Optional => "?",
            Self::HiddenOptional => "(?)",
            Self::NoLoadOrder => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Equal,
    Eq,
    Ge,
    Gt,
    Compatible,
}

impl Comparator {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            "=" => Some(Self::Equal),
            "==" => Some(Self::Eq),
            ">=" => Some(Self::Ge),
            ">" => Some(Self::Gt),
            "~>" => Some(Self::Compatible),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Equal => "=",
            Self::Eq => "==",
            Self::Ge => ">=",
            Self::Gt => ">",
            Self::Compatible => "~>",
        }
    }

    /// Comparators whose version can be refreshed in place by `--upgrade`.
    pub fn supports_upgrade(self) -> bool {
        matches!(self, Self::Ge | Self::Eq | Self::Equal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraint {
    pub op: Comparator,
    pub version: ModVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub flag: Option<DependencyFlag>,
    pub name: String,
    pub constraint: Option<Constraint>,
}

impl Dependency {
    pub fn parse(raw: &str) -> Result<Self> {
        let captures = dependency_regex()
            .captures(raw)
            .ok_or_else(|| anyhow!("unrecognized dependency format: {raw:?}"))?;
        let flag = captures
            .get(1)
            .and_then(|m| DependencyFlag::parse(m.as_str()));
        let name = captures
            .get(2)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| anyhow!("dependency has no name: {raw:?}"))?;
        let constraint = match (captures.get(3), captures.get(4)) {
            (Some(op), Some(version)) => {
                let op = Comparator::parse(op.as_str())
                    .ok_or_else(|| anyhow!("unknown comparator in {raw:?}"))?;
                let version = version
                    .as_str()
                    .parse()
                    .with_context(|| format!("parse dependency {raw:?}"))?;
                Some(Constraint { op, version })
            }
            _ => None,
        };
        Ok(Self {
            flag,
            name,
            constraint,
        })
    }

    pub fn with_constraint(&self, constraint: Constraint) -> Self {
        Self {
            constraint: Some(constraint),
            ..self.clone()
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(flag) = self.flag {
            write!(f, "{} ", flag.as_str())?;
        }
        f.write_str(&self.name)?;
        if let Some(constraint) = &self.constraint {
            write!(f, " {} {}", constraint.op.as_str(), constraint.version)?;
        }
        Ok(())
    }
}
