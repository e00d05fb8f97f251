//! Общие константы (имена файлов рабочего каталога, формат архива, окно кэша).

// -------- Working directory --------
pub const DEFAULT_WORKDIR_NAME: &str = "statepack";
pub const RELATIONAL_DUMP_FILE: &str = "current.sql";
pub const SEARCH_DUMP_FILE: &str = "current.idx";
pub const LOCK_FILE: &str = "LOCK";

// -------- Archive naming --------
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const ARCHIVE_EXT: &str = "archive";
// Сортируемая метка времени: 2024-03-01@142233
pub const ARCHIVE_TS_FORMAT: &str = "%Y-%m-%d@%H%M%S";

// -------- Cache freshness --------
pub const DEFAULT_CACHE_WINDOW_SECS: u64 = 60;

// -------- Pack container (v1) --------
// Header (16 байт): [magic8="SPACK001"][ver u32=1][reserved u32]
pub const PACK_MAGIC: &[u8; 8] = b"SPACK001";
pub const PACK_VERSION: u32 = 1;
pub const PACK_HDR_SIZE: usize = 16;

// Frame (v1):
// [name_len u16][data_len u64] + name + data + [crc32 u32]
// CRC считается по (name_len, data_len, name, data); хвостовой CRC позволяет
// писать данные потоком без буферизации всего файла.
// Конец потока — заголовок с name_len=0, data_len=0 (без CRC).
pub const FRAME_HDR_SIZE: usize = 10;
pub const FRAME_OFF_NAME_LEN: usize = 0;
pub const FRAME_OFF_DATA_LEN: usize = 2;
pub const FRAME_CRC_SIZE: usize = 4;

// Максимальная длина имени записи (байт).
pub const MAX_ENTRY_NAME: usize = 4096;

// Сигнатуры потоков сжатия (автоопределение при extract).
pub const GZIP_MAGIC: &[u8; 2] = &[0x1f, 0x8b];
pub const ZSTD_MAGIC: &[u8; 4] = &[0x28, 0xb5, 0x2f, 0xfd];

// -------- Tree dump (TreeDumper) --------
// Тот же формат фреймов, но свой magic: внутри допускаются относительные пути.
pub const TREE_MAGIC: &[u8; 8] = b"SPTREE01";
