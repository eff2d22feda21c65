//! Declarative dimension registries.
//!
//! A [`Schema`] lists the dimensions an entity type stores, in declaration
//! order. Entity types expose their schema through [`SeriesModel`], usually
//! via the [`series_model!`](crate::series_model) macro:
//!
//! ```rust
//! use timely_core::schema::SeriesModel;
//!
//! timely_core::series_model! {
//!     pub struct Position {
//!         value,
//!         position_lat: lazy,
//!         position_long: lazy,
//!     }
//! }
//!
//! // Inherits a snapshot of `Position`'s dimensions.
//! timely_core::series_model! {
//!     pub struct TaggedPosition: Position {
//!         tag,
//!     }
//! }
//!
//! assert_eq!(Position::schema().names(false), vec!["value"]);
//! assert_eq!(TaggedPosition::schema().names(false), vec!["value", "tag"]);
//! ```

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimensionOptions {
    /// Excluded from default field selection unless named explicitly.
    pub lazy: bool,
}

impl DimensionOptions {
    pub fn lazy() -> Self {
        Self { lazy: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    dimensions: Vec<(String, DimensionOptions)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of this registry for a derived type.
    ///
    /// The copy is independent: later declarations on either side do not
    /// show up on the other.
    pub fn derive(&self) -> Self {
        self.clone()
    }

    /// Insert or update a dimension. Re-declaring keeps the original position.
    pub fn declare(&mut self, name: impl Into<String>, options: DimensionOptions) -> &mut Self {
        let name = name.into();
        match self.dimensions.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = options,
            None => self.dimensions.push((name, options)),
        }
        self
    }

    pub fn dimension(mut self, name: impl Into<String>) -> Self {
        self.declare(name, DimensionOptions::default());
        self
    }

    pub fn lazy_dimension(mut self, name: impl Into<String>) -> Self {
        self.declare(name, DimensionOptions::lazy());
        self
    }

    /// All dimensions, or only the eager ones when `include_lazy` is false.
    pub fn dimensions(&self, include_lazy: bool) -> Vec<(&str, DimensionOptions)> {
        self.dimensions
            .iter()
            .filter(|(_, options)| include_lazy || !options.lazy)
            .map(|(name, options)| (name.as_str(), *options))
            .collect()
    }

    pub fn names(&self, include_lazy: bool) -> Vec<String> {
        self.dimensions(include_lazy)
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect()
    }

    pub fn options(&self, name: &str) -> Option<DimensionOptions> {
        self.dimensions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, options)| *options)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.options(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

/// An entity type stored as a series.
pub trait SeriesModel {
    fn schema() -> &'static Schema;
}

/// Declare a unit type implementing [`SeriesModel`].
///
/// Dimensions are listed in order; `name: lazy` marks a lazy dimension.
/// `struct Child: Parent { ... }` starts from a snapshot of `Parent`'s schema.
/// The generated type derives `Debug`, `Clone`, `Copy` and `Default`.
#[macro_export]
macro_rules! series_model {
    (@base) => {
        $crate::schema::Schema::new()
    };
    (@base $parent:ty) => {
        <$parent as $crate::schema::SeriesModel>::schema().derive()
    };
    (@options) => {
        $crate::schema::DimensionOptions::default()
    };
    (@options lazy) => {
        $crate::schema::DimensionOptions::lazy()
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(: $parent:ty)? {
            $($dimension:ident $(: $flag:ident)?),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $name;

        impl $crate::schema::SeriesModel for $name {
            fn schema() -> &'static $crate::schema::Schema {
                static SCHEMA: $crate::__private::Lazy<$crate::schema::Schema> =
                    $crate::__private::Lazy::new(|| {
                        #[allow(unused_mut)]
                        let mut schema = $crate::series_model!(@base $($parent)?);
                        $(
                            schema.declare(
                                stringify!($dimension),
                                $crate::series_model!(@options $($flag)?),
                            );
                        )*
                        schema
                    });
                &SCHEMA
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::series_model! {
        struct TestSeries {
            value,
            position_lat: lazy,
            position_long: lazy,
        }
    }

    crate::series_model! {
        struct TestSeriesSubclass: TestSeries {}
    }

    crate::series_model! {
        struct Extended: TestSeries {
            heading,
            value: lazy,
        }
    }

    #[test]
    fn test_declared_order_and_laziness() {
        let schema = TestSeries::schema();
        assert_eq!(schema.names(true), vec!["value", "position_lat", "position_long"]);
        assert_eq!(schema.names(false), vec!["value"]);
        assert_eq!(schema.options("position_lat"), Some(DimensionOptions::lazy()));
        assert!(!schema.contains("heading"));
    }

    #[test]
    fn test_subclass_inherits() {
        assert_eq!(TestSeriesSubclass::schema(), TestSeries::schema());
    }

    #[test]
    fn test_subclass_redeclare_is_upsert() {
        let schema = Extended::schema();
        assert_eq!(
            schema.names(true),
            vec!["value", "position_lat", "position_long", "heading"]
        );
        assert_eq!(schema.names(false), vec!["heading"]);
        // The parent is untouched.
        assert_eq!(TestSeries::schema().names(false), vec!["value"]);
    }

    #[test]
    fn test_declare_is_idempotent() {
        let mut schema = Schema::new().dimension("value");
        schema.declare("value", DimensionOptions::default());
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_derive_is_a_snapshot() {
        let mut base = Schema::new().dimension("value");
        let derived = base.derive();
        base.declare("late", DimensionOptions::default());
        assert!(base.contains("late"));
        assert!(!derived.contains("late"));
        assert_eq!(derived.names(true), vec!["value"]);
    }
}
