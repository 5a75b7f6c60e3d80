//! Buffer ring operations: edit, save, close.

use std::path::{Path, PathBuf};

use crate::error::{ErrorKind, Exec, TekoError, TekoInt, Unwind};
use crate::frontend::Severity;
use crate::ring::{absolute_path, savepoint_path, translate_in, translate_out, BufferId};
use crate::undo::UndoToken;

use super::{EdFlags, Hook, Interp, Target};

impl Interp {
	/// Marks the current buffer modified, once, with banner update.
	pub fn dirtify(&mut self) {
		let Some(id) = self.ring.current else {
			return;
		};
		let Some(buffer) = self.ring.get(id) else {
			return;
		};
		if buffer.dirty {
			return;
		}
		self.undo.push(UndoToken::InfoUpdate);
		self.undo.push(UndoToken::BufferDirty { id, dirty: false });
		if let Some(buffer) = self.ring.get_mut(id) {
			buffer.dirty = true;
		}
		self.info_update();
	}

	/// `EB<file>$` and `EB$`: find a buffer by canonical path (or the
	/// unnamed buffer) or add a fresh one, loading regular files.
	pub fn ring_edit_path(&mut self, path: Option<&Path>) -> Exec<()> {
		self.current_save_dot();
		let target = self.current_target();
		self.undo.push(UndoToken::EditTarget(target));

		let canonical = path.map(absolute_path);
		let existing = match &canonical {
			Some(c) => self.ring.find_by_path(c),
			None => self
				.ring
				.iter()
				.find(|b| b.filename.is_none())
				.map(|b| b.id),
		};

		if let Some(id) = existing {
			self.current_reg = None;
			self.ring.current = Some(id);
			if let Some(buffer) = self.ring.get(id) {
				let (doc, dot) = (buffer.doc, buffer.dot);
				self.view.set_doc(doc);
				self.view.goto_pos(dot);
			}
			self.info_update();
			self.run_hook(Hook::Edit)?;
			return Ok(());
		}

		let doc = self.view.create_doc();
		let id = self.ring.push(canonical.clone(), doc);
		self.current_reg = None;
		self.ring.current = Some(id);
		self.undo.push(UndoToken::CloseBuffer { id });
		self.view.set_doc(doc);

		match &canonical {
			Some(c) if c.is_file() => {
				self.buffer_load(id, c).map_err(Unwind::Error)?;
				let text = format!("Added file \"{}\" to ring", c.display());
				self.msg(Severity::Info, &text);
			}
			Some(c) => {
				let text = format!("Added new file \"{}\" to ring", c.display());
				self.msg(Severity::Info, &text);
			}
			None => {
				self.msg(Severity::Info, "Added new unnamed file to ring.");
			}
		}
		self.view.goto_pos(0);
		self.info_update();
		self.run_hook(Hook::Add)?;
		Ok(())
	}

	/// `<n>EB`: select a buffer by 1-based ring position.
	pub fn ring_edit_id(&mut self, id: TekoInt) -> Exec<()> {
		let buffer_id = match usize::try_from(id)
			.ok()
			.and_then(|pos| self.ring.by_position(pos))
		{
			Some(buffer) => buffer.id,
			None => {
				return Err(TekoError::command(format!("invalid buffer id {}", id)).into())
			}
		};

		self.current_save_dot();
		let target = self.current_target();
		self.undo.push(UndoToken::EditTarget(target));

		self.current_reg = None;
		self.ring.current = Some(buffer_id);
		if let Some(buffer) = self.ring.get(buffer_id) {
			let (doc, dot) = (buffer.doc, buffer.dot);
			self.view.set_doc(doc);
			self.view.goto_pos(dot);
		}
		self.info_update();
		self.run_hook(Hook::Edit)?;
		Ok(())
	}

	fn buffer_load(&mut self, id: BufferId, path: &Path) -> crate::error::Result<()> {
		let bytes = std::fs::read(path).map_err(|e| ErrorKind::File {
			path: path.to_path_buf(),
			source: e,
		})?;

		let (text, detected) = if self.flags.contains(EdFlags::EOL_TRANSLATE) {
			translate_in(&bytes)
		} else {
			(String::from_utf8_lossy(&bytes).into_owned(), None)
		};

		let doc = self.ring.get(id).map(|b| b.doc).unwrap_or_default();
		self.view.set_doc(doc);
		self.view.begin_undo_action();
		self.view.set_text(&text);
		self.view.end_undo_action();
		if let Some(eol) = detected {
			self.view.set_eol_mode(eol);
		}
		Ok(())
	}

	/// `EW<file>$`: save the current buffer.
	pub fn ring_save(&mut self, path: Option<&Path>) -> Exec<()> {
		let Some(id) = self.ring.current else {
			return Err(TekoError::command("unable to save file").into());
		};
		self.save_buffer(id, path)
	}

	/// `:EX`: save every modified buffer.
	pub fn save_all_dirty(&mut self) -> Exec<()> {
		let dirty: Vec<BufferId> = self
			.ring
			.iter()
			.filter(|b| b.dirty)
			.map(|b| b.id)
			.collect();
		for id in dirty {
			self.save_buffer(id, None)?;
		}
		Ok(())
	}

	fn save_buffer(&mut self, id: BufferId, path: Option<&Path>) -> Exec<()> {
		let buffer_filename = self.ring.get(id).and_then(|b| b.filename.clone());
		let filename: PathBuf = match path {
			Some(p) => p.to_path_buf(),
			None => match &buffer_filename {
				Some(f) => f.clone(),
				None => return Err(TekoError::command("unable to save file").into()),
			},
		};

		if self.undo.enabled {
			match &buffer_filename {
				Some(existing) if existing.is_file() => {
					let serial = self.ring.next_savepoint_serial();
					let savepoint = savepoint_path(existing, serial);
					match std::fs::rename(existing, &savepoint) {
						Ok(()) => {
							self.undo.push(UndoToken::RestoreSavepoint {
								savepoint,
								original: existing.clone(),
							});
						}
						Err(_) => {
							let text = format!(
								"Unable to create save point file \"{}\"",
								savepoint.display()
							);
							self.msg(Severity::Warning, &text);
						}
					}
				}
				_ => {
					self.undo
						.push(UndoToken::RemoveFile(absolute_path(&filename)));
				}
			}
		}

		let (doc, eol, was_dirty) = {
			let buffer = self
				.ring
				.get(id)
				.ok_or_else(|| TekoError::command("unable to save file"))?;
			(buffer.doc, self.view.doc_eol(buffer.doc), buffer.dirty)
		};
		let text = self.view.doc_text(doc);
		let bytes = if self.flags.contains(EdFlags::EOL_TRANSLATE) {
			translate_out(&text, eol)
		} else {
			text.into_bytes()
		};
		std::fs::write(&filename, bytes).map_err(|e| {
			Unwind::Error(TekoError::new(ErrorKind::File {
				path: filename.clone(),
				source: e,
			}))
		})?;

		self.undo.push(UndoToken::InfoUpdate);
		self.undo.push(UndoToken::BufferDirty {
			id,
			dirty: was_dirty,
		});
		self.undo.push(UndoToken::BufferFilename {
			id,
			filename: buffer_filename,
		});
		if let Some(buffer) = self.ring.get_mut(id) {
			buffer.dirty = false;
			buffer.filename = Some(absolute_path(&filename));
		}
		if self.ring.current == Some(id) {
			self.info_update();
		}
		Ok(())
	}

	/// `EF`: remove the current buffer; the neighbor (or a fresh unnamed
	/// buffer) becomes current.
	pub fn ring_close(&mut self) -> Exec<()> {
		let Some(id) = self.ring.current else {
			return Err(TekoError::command("no buffer to close").into());
		};
		let dot = self.view.current_pos();
		if let Some(buffer) = self.ring.get_mut(id) {
			buffer.dot = dot;
		}

		let Some((buffer, index)) = self.ring.remove(id) else {
			return Err(TekoError::command("no buffer to close").into());
		};
		let text = format!("Removed file \"{}\" from the ring", buffer.name());
		self.msg(Severity::Info, &text);

		let closed_doc = buffer.doc;
		if self.undo.enabled {
			self.undo.push(UndoToken::ReinsertBuffer {
				buffer: Box::new(buffer),
				index,
			});
		}

		match self.ring.neighbor_after_removal(index) {
			Some(next) => {
				self.target_edit(&Target::Buffer(next));
				if !self.undo.enabled {
					self.free_doc_deferred(closed_doc);
				}
				self.run_hook(Hook::Edit)?;
			}
			None => {
				self.ring.current = None;
				self.current_reg = None;
				self.ring_edit_path(None)?;
				if !self.undo.enabled {
					self.free_doc_deferred(closed_doc);
				}
			}
		}
		Ok(())
	}
}
