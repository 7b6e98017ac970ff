use super::models::*;
use super::schema::CLASSROOM_VERSIONED_SCHEMAS;
use super::ClassroomStore;
use crate::sqlite_persistence::open_versioned;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const RECORDING_COLUMNS: &str = "id, classroom_id, original_filename, audio_filename, \
     audio_path, spectrogram_filename, researcher, description, location, tags, created_at";

#[derive(Clone)]
pub struct SqliteClassroomStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteClassroomStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path.as_ref(), CLASSROOM_VERSIONED_SCHEMAS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        CLASSROOM_VERSIONED_SCHEMAS
            .last()
            .expect("at least one schema version")
            .create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_classroom(row: &Row) -> rusqlite::Result<Classroom> {
        Ok(Classroom {
            id: row.get("id")?,
            building: row.get("building")?,
            name: row.get("name")?,
            window_count: row.get("window_count")?,
            created_at: row.get("created_at")?,
        })
    }

    fn row_to_surface(row: &Row) -> rusqlite::Result<Surface> {
        Ok(Surface {
            id: row.get("id")?,
            classroom_id: row.get("classroom_id")?,
            space_name: row.get("space_name")?,
            material: row.get("material")?,
            area: row.get("area")?,
        })
    }

    fn row_to_image(row: &Row) -> rusqlite::Result<ClassroomImage> {
        Ok(ClassroomImage {
            id: row.get("id")?,
            classroom_id: row.get("classroom_id")?,
            filename: row.get("filename")?,
        })
    }

    fn row_to_recording(row: &Row) -> rusqlite::Result<Recording> {
        Ok(Recording {
            id: row.get("id")?,
            classroom_id: row.get("classroom_id")?,
            original_filename: row.get("original_filename")?,
            audio_filename: row.get("audio_filename")?,
            audio_path: row.get("audio_path")?,
            spectrogram_filename: row.get("spectrogram_filename")?,
            metadata: RecordingMetadata {
                researcher: row.get("researcher")?,
                description: row.get("description")?,
                location: row.get("location")?,
                tags: row.get("tags")?,
            },
            created_at: row.get("created_at")?,
        })
    }

    fn insert_surfaces(tx: &Transaction, classroom_id: i64, surfaces: &[NewSurface]) -> Result<()> {
        let mut stmt = tx.prepare(
            "INSERT INTO surfaces (classroom_id, space_name, material, area) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for surface in surfaces {
            stmt.execute(params![
                classroom_id,
                surface.space_name,
                surface.material,
                surface.area
            ])?;
        }
        Ok(())
    }

    fn insert_images(tx: &Transaction, classroom_id: i64, filenames: &[String]) -> Result<()> {
        let mut stmt =
            tx.prepare("INSERT INTO classroom_images (classroom_id, filename) VALUES (?1, ?2)")?;
        for filename in filenames {
            stmt.execute(params![classroom_id, filename])?;
        }
        Ok(())
    }

    fn query_recordings(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Recording>> {
        let mut stmt = conn.prepare(sql)?;
        let recordings = stmt
            .query_map(args, Self::row_to_recording)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recordings)
    }
}

/// Escapes LIKE wildcards so the user query is matched literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl ClassroomStore for SqliteClassroomStore {
    fn create_classroom(
        &self,
        classroom: &NewClassroom,
        surfaces: &[NewSurface],
        image_filenames: &[String],
    ) -> Result<i64> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO classrooms (building, name, window_count) VALUES (?1, ?2, ?3)",
            params![classroom.building, classroom.name, classroom.window_count],
        )?;
        let id = tx.last_insert_rowid();
        Self::insert_surfaces(&tx, id, surfaces)?;
        Self::insert_images(&tx, id, image_filenames)?;
        tx.commit()?;
        debug!(
            "Created classroom {} with {} surfaces and {} images",
            id,
            surfaces.len(),
            image_filenames.len()
        );
        Ok(id)
    }

    fn get_classroom(&self, id: i64) -> Result<Option<Classroom>> {
        let conn = self.conn.lock().unwrap();
        let classroom = conn
            .query_row(
                "SELECT id, building, name, window_count, created_at FROM classrooms WHERE id = ?1",
                params![id],
                Self::row_to_classroom,
            )
            .optional()?;
        Ok(classroom)
    }

    fn get_classroom_detail(&self, id: i64) -> Result<Option<ClassroomDetail>> {
        let conn = self.conn.lock().unwrap();
        let classroom = match conn
            .query_row(
                "SELECT id, building, name, window_count, created_at FROM classrooms WHERE id = ?1",
                params![id],
                Self::row_to_classroom,
            )
            .optional()?
        {
            Some(c) => c,
            None => return Ok(None),
        };

        let surfaces = conn
            .prepare(
                "SELECT id, classroom_id, space_name, material, area
                 FROM surfaces WHERE classroom_id = ?1 ORDER BY id",
            )?
            .query_map(params![id], Self::row_to_surface)?
            .collect::<Result<Vec<_>, _>>()?;

        let images = conn
            .prepare(
                "SELECT id, classroom_id, filename
                 FROM classroom_images WHERE classroom_id = ?1 ORDER BY id",
            )?
            .query_map(params![id], Self::row_to_image)?
            .collect::<Result<Vec<_>, _>>()?;

        let recordings = Self::query_recordings(
            &conn,
            &format!(
                "SELECT {} FROM recordings WHERE classroom_id = ?1 ORDER BY id",
                RECORDING_COLUMNS
            ),
            params![id],
        )?;

        Ok(Some(ClassroomDetail {
            classroom,
            surfaces,
            images,
            recordings,
        }))
    }

    fn list_classrooms(&self, query: Option<&str>) -> Result<Vec<Classroom>> {
        let conn = self.conn.lock().unwrap();
        let pattern = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(like_pattern);

        let mut stmt = conn.prepare(
            "SELECT id, building, name, window_count, created_at FROM classrooms c
             WHERE ?1 IS NULL
                OR c.building LIKE ?1 ESCAPE '\\'
                OR c.name LIKE ?1 ESCAPE '\\'
                OR EXISTS (
                    SELECT 1 FROM surfaces s
                    WHERE s.classroom_id = c.id AND s.material LIKE ?1 ESCAPE '\\'
                )
             ORDER BY c.id",
        )?;
        let classrooms = stmt
            .query_map(params![pattern], Self::row_to_classroom)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(classrooms)
    }

    fn update_classroom(&self, id: i64, update: &ClassroomUpdate) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE classrooms SET building = ?1, name = ?2, window_count = ?3 WHERE id = ?4",
            params![
                update.classroom.building,
                update.classroom.name,
                update.classroom.window_count,
                id
            ],
        )?;
        if updated == 0 {
            return Ok(false);
        }

        // Ids belonging to another classroom are ignored.
        for surface_id in &update.delete_surface_ids {
            tx.execute(
                "DELETE FROM surfaces WHERE id = ?1 AND classroom_id = ?2",
                params![surface_id, id],
            )?;
        }
        Self::insert_surfaces(&tx, id, &update.new_surfaces)?;

        for image_id in &update.delete_image_ids {
            tx.execute(
                "DELETE FROM classroom_images WHERE id = ?1 AND classroom_id = ?2",
                params![image_id, id],
            )?;
        }
        Self::insert_images(&tx, id, &update.new_image_filenames)?;

        tx.commit()?;
        Ok(true)
    }

    fn delete_classroom(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let images = tx.execute("DELETE FROM classroom_images WHERE classroom_id = ?1", params![id])?;
        let recordings = tx.execute("DELETE FROM recordings WHERE classroom_id = ?1", params![id])?;
        let surfaces = tx.execute("DELETE FROM surfaces WHERE classroom_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM classrooms WHERE id = ?1", params![id])?;
        tx.commit()?;
        debug!(
            "Deleted classroom {}: {} images, {} recordings, {} surfaces",
            id, images, recordings, surfaces
        );
        Ok(deleted > 0)
    }

    fn get_image(&self, id: i64) -> Result<Option<ClassroomImage>> {
        let conn = self.conn.lock().unwrap();
        let image = conn
            .query_row(
                "SELECT id, classroom_id, filename FROM classroom_images WHERE id = ?1",
                params![id],
                Self::row_to_image,
            )
            .optional()?;
        Ok(image)
    }

    fn insert_recording(&self, recording: &NewRecording) -> Result<Recording> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO recordings (classroom_id, original_filename, audio_filename,
                audio_path, spectrogram_filename, researcher, description, location, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                recording.classroom_id,
                recording.original_filename,
                recording.audio_filename,
                recording.audio_path,
                recording.spectrogram_filename,
                recording.metadata.researcher,
                recording.metadata.description,
                recording.metadata.location,
                recording.metadata.tags,
            ],
        )?;
        let id = conn.last_insert_rowid();
        let inserted = conn.query_row(
            &format!("SELECT {} FROM recordings WHERE id = ?1", RECORDING_COLUMNS),
            params![id],
            Self::row_to_recording,
        )?;
        Ok(inserted)
    }

    fn get_recording(&self, id: i64) -> Result<Option<Recording>> {
        let conn = self.conn.lock().unwrap();
        let recording = conn
            .query_row(
                &format!("SELECT {} FROM recordings WHERE id = ?1", RECORDING_COLUMNS),
                params![id],
                Self::row_to_recording,
            )
            .optional()?;
        Ok(recording)
    }

    fn list_recordings(&self, scope: RecordingScope) -> Result<Vec<Recording>> {
        let conn = self.conn.lock().unwrap();
        match scope {
            RecordingScope::All => Self::query_recordings(
                &conn,
                &format!("SELECT {} FROM recordings ORDER BY id", RECORDING_COLUMNS),
                params![],
            ),
            RecordingScope::TopLevel => Self::query_recordings(
                &conn,
                &format!(
                    "SELECT {} FROM recordings WHERE classroom_id IS NULL ORDER BY id",
                    RECORDING_COLUMNS
                ),
                params![],
            ),
            RecordingScope::Classroom(classroom_id) => Self::query_recordings(
                &conn,
                &format!(
                    "SELECT {} FROM recordings WHERE classroom_id = ?1 ORDER BY id",
                    RECORDING_COLUMNS
                ),
                params![classroom_id],
            ),
        }
    }

    fn delete_recording(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM recordings WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}
