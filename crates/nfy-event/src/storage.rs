//! Postgres column codec for [`Type`] and [`Severity`].
//!
//! Columns are plain `text` (constrained to the wire tokens by the schema).
//! SQL NULL decodes to the absent member and the absent member encodes to
//! SQL NULL. Integer or boolean columns fail sqlx's compatibility check with
//! a type-mismatch error before `decode` is ever reached.

use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef, Postgres};
use sqlx::{Decode, Encode, Type as SqlType, ValueRef};

use crate::kind::{Severity, Type};

macro_rules! text_column {
    ($name:ident) => {
        impl SqlType<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <&str as SqlType<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <&str as SqlType<Postgres>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
                match self.to_storage() {
                    Some(token) => <&str as Encode<'q, Postgres>>::encode_by_ref(&token, buf),
                    None => IsNull::Yes,
                }
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                if value.is_null() {
                    return Ok(<$name>::default());
                }
                let raw = <&str as Decode<'r, Postgres>>::decode(value)?;
                Ok(<$name>::from_storage(Some(raw))?)
            }
        }
    };
}

text_column!(Type);
text_column!(Severity);
