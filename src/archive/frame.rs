//! Потоковый формат фреймов (общий для архива и TreeDumper).
//!
//! Поток:
//!   [magic8][ver u32][reserved u32]
//!   frame*:  [name_len u16][data_len u64] + name + data + [crc32 u32]
//!   end:     [name_len=0 u16][data_len=0 u64]
//!
//! CRC покрывает заголовок фрейма, имя и данные. Данные пишутся и читаются
//! потоком (без загрузки файла в память), поэтому CRC хвостовой.
//!
//! Ошибки чтения:
//! - неверный magic/версия, битый CRC, обрыв потока, не-UTF8 имя → SnapError::Format;
//! - прочие ошибки ввода-вывода → SnapError::Io.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher as Crc32;

use crate::consts::{
    FRAME_CRC_SIZE, FRAME_HDR_SIZE, FRAME_OFF_DATA_LEN, FRAME_OFF_NAME_LEN, MAX_ENTRY_NAME,
    PACK_HDR_SIZE, PACK_VERSION,
};
use crate::error::SnapError;

const COPY_BUF: usize = 64 * 1024;

/// Заголовок очередного фрейма. Данные нужно прочитать через
/// `FrameReader::read_data` (или пропустить через `skip_data`) до следующего `next_frame`.
pub struct Frame {
    pub name: String,
    pub data_len: u64,
    crc: Crc32,
}

// ---------------------- writer ----------------------

pub struct FrameWriter<W: Write> {
    inner: W,
    frames: u64,
    bytes: u64,
}

impl<W: Write> FrameWriter<W> {
    /// Пишет заголовок потока.
    pub fn new(mut inner: W, magic: &[u8; 8]) -> io::Result<Self> {
        let mut hdr = [0u8; PACK_HDR_SIZE];
        hdr[..8].copy_from_slice(magic);
        LittleEndian::write_u32(&mut hdr[8..12], PACK_VERSION);
        // [12..16] reserved
        inner.write_all(&hdr)?;
        Ok(Self {
            inner,
            frames: 0,
            bytes: PACK_HDR_SIZE as u64,
        })
    }

    /// Добавить файл целиком, потоково. Длина берётся из metadata;
    /// если файл изменился во время чтения — ошибка.
    pub fn add_file(&mut self, name: &str, src: &Path) -> Result<u64> {
        let mut f = File::open(src).map_err(|e| SnapError::io("open", src, e))?;
        let len = f
            .metadata()
            .map_err(|e| SnapError::io("stat", src, e))?
            .len();

        let mut crc = self.write_frame_header(name, len)?;

        let mut buf = vec![0u8; COPY_BUF];
        let mut left = len;
        while left > 0 {
            let want = left.min(COPY_BUF as u64) as usize;
            let n = f
                .read(&mut buf[..want])
                .map_err(|e| SnapError::io("read", src, e))?;
            if n == 0 {
                return Err(SnapError::io(
                    "read",
                    src,
                    io::Error::new(io::ErrorKind::UnexpectedEof, "file shrank while packing"),
                )
                .into());
            }
            crc.update(&buf[..n]);
            self.inner.write_all(&buf[..n])?;
            left -= n as u64;
        }

        self.write_crc(crc)?;
        self.frames += 1;
        self.bytes += len;
        Ok(len)
    }

    /// Добавить запись из памяти (используется для пустых каталогов в TreeDumper).
    pub fn add_bytes(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let mut crc = self.write_frame_header(name, data.len() as u64)?;
        crc.update(data);
        self.inner.write_all(data)?;
        self.write_crc(crc)?;
        self.frames += 1;
        self.bytes += data.len() as u64;
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Полезные байты + служебные (без учёта сжатия).
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Пишет маркер конца и возвращает внутренний writer (не финализируя кодек).
    pub fn finish(mut self) -> io::Result<W> {
        let end = [0u8; FRAME_HDR_SIZE];
        self.inner.write_all(&end)?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn write_frame_header(&mut self, name: &str, data_len: u64) -> Result<Crc32> {
        let nb = name.as_bytes();
        if nb.is_empty() || nb.len() > MAX_ENTRY_NAME {
            return Err(SnapError::config(format!(
                "entry name length {} out of range 1..={}",
                nb.len(),
                MAX_ENTRY_NAME
            ))
            .into());
        }
        let mut hdr = [0u8; FRAME_HDR_SIZE];
        LittleEndian::write_u16(
            &mut hdr[FRAME_OFF_NAME_LEN..FRAME_OFF_NAME_LEN + 2],
            nb.len() as u16,
        );
        LittleEndian::write_u64(
            &mut hdr[FRAME_OFF_DATA_LEN..FRAME_OFF_DATA_LEN + 8],
            data_len,
        );

        let mut crc = Crc32::new();
        crc.update(&hdr);
        crc.update(nb);

        self.inner.write_all(&hdr)?;
        self.inner.write_all(nb)?;
        self.bytes += (FRAME_HDR_SIZE + nb.len() + FRAME_CRC_SIZE) as u64;
        Ok(crc)
    }

    fn write_crc(&mut self, crc: Crc32) -> io::Result<()> {
        let mut tail = [0u8; FRAME_CRC_SIZE];
        LittleEndian::write_u32(&mut tail, crc.finalize());
        self.inner.write_all(&tail)
    }
}

// ---------------------- reader ----------------------

pub struct FrameReader<R: Read> {
    inner: R,
    origin: PathBuf,
    done: bool,
}

impl<R: Read> FrameReader<R> {
    /// Читает и проверяет заголовок потока. `origin` — путь для сообщений об ошибках.
    pub fn new(mut inner: R, magic: &[u8; 8], origin: &Path) -> Result<Self> {
        let mut hdr = [0u8; PACK_HDR_SIZE];
        read_exact_fmt(&mut inner, &mut hdr, origin, "stream header")?;
        if &hdr[..8] != magic {
            return Err(SnapError::format(origin, "bad magic").into());
        }
        let ver = LittleEndian::read_u32(&hdr[8..12]);
        if ver != PACK_VERSION {
            return Err(SnapError::format(origin, format!("unsupported version {}", ver)).into());
        }
        Ok(Self {
            inner,
            origin: origin.to_path_buf(),
            done: false,
        })
    }

    /// Следующий фрейм или None на маркере конца.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.done {
            return Ok(None);
        }
        let mut hdr = [0u8; FRAME_HDR_SIZE];
        read_exact_fmt(&mut self.inner, &mut hdr, &self.origin, "frame header")?;
        let name_len =
            LittleEndian::read_u16(&hdr[FRAME_OFF_NAME_LEN..FRAME_OFF_NAME_LEN + 2]) as usize;
        let data_len = LittleEndian::read_u64(&hdr[FRAME_OFF_DATA_LEN..FRAME_OFF_DATA_LEN + 8]);

        if name_len == 0 {
            if data_len != 0 {
                return Err(SnapError::format(&self.origin, "frame with empty name").into());
            }
            self.done = true;
            return Ok(None);
        }
        if name_len > MAX_ENTRY_NAME {
            return Err(SnapError::format(
                &self.origin,
                format!("entry name too long ({} bytes)", name_len),
            )
            .into());
        }

        let mut name_buf = vec![0u8; name_len];
        read_exact_fmt(&mut self.inner, &mut name_buf, &self.origin, "entry name")?;

        let mut crc = Crc32::new();
        crc.update(&hdr);
        crc.update(&name_buf);

        let name = String::from_utf8(name_buf)
            .map_err(|_| SnapError::format(&self.origin, "entry name is not UTF-8"))?;

        Ok(Some(Frame {
            name,
            data_len,
            crc,
        }))
    }

    /// Скопировать данные фрейма в `out` и проверить CRC.
    pub fn read_data<W: Write>(&mut self, frame: Frame, out: &mut W) -> Result<u64> {
        let Frame {
            name,
            data_len,
            mut crc,
        } = frame;

        let mut buf = vec![0u8; COPY_BUF];
        let mut left = data_len;
        while left > 0 {
            let want = left.min(COPY_BUF as u64) as usize;
            read_exact_fmt(&mut self.inner, &mut buf[..want], &self.origin, "entry data")?;
            crc.update(&buf[..want]);
            out.write_all(&buf[..want])?;
            left -= want as u64;
        }

        let mut tail = [0u8; FRAME_CRC_SIZE];
        read_exact_fmt(&mut self.inner, &mut tail, &self.origin, "entry crc")?;
        let crc_expected = LittleEndian::read_u32(&tail);
        if crc.finalize() != crc_expected {
            return Err(SnapError::format(
                &self.origin,
                format!("CRC mismatch for entry '{}'", name),
            )
            .into());
        }
        Ok(data_len)
    }

    /// Пропустить данные фрейма (CRC всё равно проверяется).
    pub fn skip_data(&mut self, frame: Frame) -> Result<u64> {
        self.read_data(frame, &mut io::sink())
    }
}

/// read_exact с классификацией: обрыв и битые данные декомпрессора → Format.
fn read_exact_fmt<R: Read>(r: &mut R, buf: &mut [u8], origin: &Path, what: &str) -> Result<()> {
    match r.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) => match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                Err(SnapError::format(origin, format!("truncated {}", what)).into())
            }
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::Other => {
                Err(SnapError::format(origin, format!("corrupt {}: {}", what, e)).into())
            }
            _ => Err(SnapError::io("read", origin, e).into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MAGIC: &[u8; 8] = b"TESTFRM1";

    fn sample() -> Vec<u8> {
        let mut w = FrameWriter::new(Vec::new(), MAGIC).unwrap();
        w.add_bytes("a.txt", b"hello").unwrap();
        w.add_bytes("b.bin", &[0u8; 3]).unwrap();
        assert_eq!(w.frames(), 2);
        w.finish().unwrap()
    }

    #[test]
    fn reads_back_frames_in_order() {
        let buf = sample();
        let origin = Path::new("mem");
        let mut r = FrameReader::new(Cursor::new(buf), MAGIC, origin).unwrap();

        let f = r.next_frame().unwrap().expect("first frame");
        assert_eq!(f.name, "a.txt");
        let mut out = Vec::new();
        r.read_data(f, &mut out).unwrap();
        assert_eq!(out, b"hello");

        let f = r.next_frame().unwrap().expect("second frame");
        assert_eq!(f.name, "b.bin");
        assert_eq!(r.skip_data(f).unwrap(), 3);

        assert!(r.next_frame().unwrap().is_none());
        assert!(r.next_frame().unwrap().is_none());
    }

    #[test]
    fn flipped_data_byte_is_crc_error() {
        let mut buf = sample();
        // данные "hello" начинаются после заголовка потока + заголовка фрейма + имени
        let off = PACK_HDR_SIZE + FRAME_HDR_SIZE + "a.txt".len();
        buf[off] ^= 0xFF;
        let mut r = FrameReader::new(Cursor::new(buf), MAGIC, Path::new("mem")).unwrap();
        let f = r.next_frame().unwrap().unwrap();
        let err = r.skip_data(f).unwrap_err();
        assert!(format!("{err}").contains("CRC mismatch"), "got: {err}");
    }

    #[test]
    fn truncated_stream_is_format_error() {
        let buf = sample();
        // обрезаем маркер конца посередине
        let cut = buf[..buf.len() - 4].to_vec();
        let mut r = FrameReader::new(Cursor::new(cut), MAGIC, Path::new("mem")).unwrap();
        let mut seen = 0;
        let err = loop {
            match r.next_frame() {
                Ok(Some(f)) => {
                    if let Err(e) = r.skip_data(f) {
                        break e;
                    }
                    seen += 1;
                }
                Ok(None) => panic!("end marker must be missing"),
                Err(e) => break e,
            }
        };
        assert_eq!(seen, 2);
        assert_eq!(
            crate::error::error_kind(&err),
            Some(crate::error::ErrorKind::Format)
        );
    }

    #[test]
    fn wrong_magic_rejected() {
        let buf = sample();
        assert!(FrameReader::new(Cursor::new(buf), b"OTHERMAG", Path::new("mem")).is_err());
    }
}
