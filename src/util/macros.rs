/// Converts a serenity snowflake (`GuildId`, `UserId`, ...) into the `BIGINT`
/// representation used by the database.
macro_rules! i64_from_id {
    ($id:expr) => {{
        let raw: u64 = $id.0;
        #[allow(clippy::cast_possible_wrap)]
        let raw: i64 = ::core::convert::identity::<u64>(raw) as i64;
        raw
    }};
}

/// Inverse of [`i64_from_id`].
macro_rules! id_from_i64 {
    ($ty:ident, $raw:expr) => {{
        #[allow(clippy::cast_sign_loss)]
        let raw: u64 = ::core::convert::identity::<i64>($raw) as u64;
        ::serenity::model::prelude::$ty(raw)
    }};
}

// Exporting the macro
// https://stackoverflow.com/questions/26731243/how-do-i-use-a-macro-across-module-files/67140319#67140319
pub(crate) use i64_from_id;
pub(crate) use id_from_i64;
