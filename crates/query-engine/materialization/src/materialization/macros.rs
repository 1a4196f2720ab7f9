//! Declare [`FromRow`](crate::FromRow) for plain structs.

/// Implement `FromRow` for a struct built from constructor arguments.
///
/// Arguments are bound in the order listed. With braces, each field name is
/// checked against the column it faces; the tuple-struct form checks no names.
///
/// ```
/// use query_engine_materialization::positional_row;
///
/// struct Term {
///     id: i32,
///     name: String,
/// }
///
/// positional_row!(Term { id: i32, name: String });
///
/// struct Score(i32, Option<f64>);
///
/// positional_row!(Score(i32, Option<f64>));
/// ```
#[macro_export]
macro_rules! positional_row {
    ($ty:ident { $($field:ident : $fty:ty),+ $(,)? }) => {
        impl $crate::FromRow for $ty {
            fn shape() -> $crate::Shape {
                $crate::Shape::positional(
                    stringify!($ty),
                    vec![$($crate::Member::new::<$fty>(stringify!($field))),+],
                )
            }

            fn construct(
                input: $crate::Input<'_>,
            ) -> ::std::result::Result<Self, $crate::MaterializationError> {
                match input {
                    $crate::Input::Arguments(mut arguments) => ::std::result::Result::Ok($ty {
                        $($field: arguments.next::<$fty>()?),+
                    }),
                    other => ::std::result::Result::Err(
                        other.unexpected(stringify!($ty), "constructor arguments"),
                    ),
                }
            }
        }
    };
    ($ty:ident ( $($fty:ty),+ $(,)? )) => {
        impl $crate::FromRow for $ty {
            fn shape() -> $crate::Shape {
                $crate::Shape::positional(
                    stringify!($ty),
                    vec![$($crate::Member::unnamed::<$fty>()),+],
                )
            }

            fn construct(
                input: $crate::Input<'_>,
            ) -> ::std::result::Result<Self, $crate::MaterializationError> {
                match input {
                    $crate::Input::Arguments(mut arguments) => {
                        ::std::result::Result::Ok($ty($(arguments.next::<$fty>()?),+))
                    }
                    other => ::std::result::Result::Err(
                        other.unexpected(stringify!($ty), "constructor arguments"),
                    ),
                }
            }
        }
    };
}

/// Implement `FromRow` for a struct that is default-constructed and then has
/// its fields assigned by name.
///
/// A field is matched against the column named after it, or after the string
/// given with `as`. The struct must implement `Default`.
///
/// ```
/// use query_engine_materialization::named_row;
///
/// #[derive(Default)]
/// struct Staff {
///     id: i32,
///     full_name: String,
/// }
///
/// named_row!(Staff {
///     id as "Id": i32,
///     full_name as "Name": String,
/// });
/// ```
#[macro_export]
macro_rules! named_row {
    ($ty:ident { $($field:ident $(as $column:literal)? : $fty:ty),+ $(,)? }) => {
        impl $crate::FromRow for $ty {
            fn shape() -> $crate::Shape {
                $crate::Shape::named(
                    stringify!($ty),
                    vec![$($crate::Member::new::<$fty>($crate::__member_name!($field $(, $column)?))),+],
                )
            }

            fn construct(
                input: $crate::Input<'_>,
            ) -> ::std::result::Result<Self, $crate::MaterializationError> {
                match input {
                    $crate::Input::Fields(mut fields) => {
                        let mut value = <$ty as ::std::default::Default>::default();
                        while let ::std::option::Option::Some(name) = fields.next_field() {
                            $(
                                if name == $crate::__member_name!($field $(, $column)?) {
                                    value.$field = fields.value::<$fty>()?;
                                    continue;
                                }
                            )+
                            return ::std::result::Result::Err(
                                $crate::MaterializationError::UnknownField {
                                    type_name: stringify!($ty),
                                    field: name,
                                },
                            );
                        }
                        ::std::result::Result::Ok(value)
                    }
                    other => ::std::result::Result::Err(
                        other.unexpected(stringify!($ty), "named fields"),
                    ),
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __member_name {
    ($field:ident) => {
        stringify!($field)
    };
    ($field:ident, $column:literal) => {
        $column
    };
}

/// Implement `FromRow` for a single-field wrapper around a leaf type.
///
/// ```
/// use query_engine_materialization::scalar_newtype;
///
/// struct CourseId(i32);
///
/// scalar_newtype!(CourseId(i32));
/// ```
#[macro_export]
macro_rules! scalar_newtype {
    ($ty:ident ( $inner:ty )) => {
        impl $crate::FromRow for $ty {
            fn shape() -> $crate::Shape {
                $crate::Shape::leaf(stringify!($ty))
            }

            fn construct(
                input: $crate::Input<'_>,
            ) -> ::std::result::Result<Self, $crate::MaterializationError> {
                <$inner as $crate::FromRow>::construct(input).map($ty)
            }
        }
    };
}
