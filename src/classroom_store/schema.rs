//! SQLite schema for the classroom registry.
//!
//! Child tables reference their classroom explicitly. Surfaces are plain rows and
//! cascade at the SQL level; images and recordings own files on disk, so their
//! foreign keys RESTRICT and they are removed by the explicit cascade procedure.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    ForeignKey, OnDelete, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

const CLASSROOMS_TABLE_V1: Table = Table {
    name: "classrooms",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("building", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("window_count", &SqlType::Integer),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_classrooms_building", "building")],
};

const SURFACES_TABLE_V1: Table = Table {
    name: "surfaces",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "classroom_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "classrooms",
                foreign_column: "id",
                on_delete: OnDelete::Cascade,
            })
        ),
        sqlite_column!("space_name", &SqlType::Text, non_null = true),
        sqlite_column!("material", &SqlType::Text, non_null = true),
        sqlite_column!("area", &SqlType::Real, non_null = true),
    ],
    indices: &[("idx_surfaces_classroom", "classroom_id")],
};

const CLASSROOM_IMAGES_TABLE_V1: Table = Table {
    name: "classroom_images",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "classroom_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "classrooms",
                foreign_column: "id",
                on_delete: OnDelete::Restrict,
            })
        ),
        sqlite_column!("filename", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_classroom_images_classroom", "classroom_id")],
};

/// `classroom_id` is NULL for top-level recordings.
const RECORDINGS_TABLE_V1: Table = Table {
    name: "recordings",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "classroom_id",
            &SqlType::Integer,
            foreign_key = Some(&ForeignKey {
                foreign_table: "classrooms",
                foreign_column: "id",
                on_delete: OnDelete::Restrict,
            })
        ),
        sqlite_column!("original_filename", &SqlType::Text, non_null = true),
        sqlite_column!("audio_filename", &SqlType::Text, non_null = true),
        sqlite_column!("audio_path", &SqlType::Text, non_null = true),
        sqlite_column!("spectrogram_filename", &SqlType::Text, non_null = true),
        sqlite_column!("researcher", &SqlType::Text),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("tags", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_recordings_classroom", "classroom_id")],
};

pub const CLASSROOM_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        CLASSROOMS_TABLE_V1,
        SURFACES_TABLE_V1,
        CLASSROOM_IMAGES_TABLE_V1,
        RECORDINGS_TABLE_V1,
    ],
    migration: None,
}];
