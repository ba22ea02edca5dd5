//! CAVLC 码表.
//!
//! 每个条目为 (码长, 码字). 码长为 0 表示该组合不存在.

/// coeff_token, 0 <= nC < 2, 下标 [trailing_ones][total_coeff]
pub(super) const COEFF_TOKEN_NC0: [[(u8, u16); 17]; 4] = [
    [
        (1, 1), (6, 5), (8, 7), (9, 7), (10, 7), (11, 7), (13, 15), (13, 11),
        (13, 8), (14, 15), (14, 11), (15, 15), (15, 11), (16, 15), (16, 11), (16, 7),
        (16, 4),
    ],
    [
        (0, 0), (2, 1), (6, 4), (8, 6), (9, 6), (10, 6), (11, 6), (13, 14),
        (13, 10), (14, 14), (14, 10), (15, 14), (15, 10), (15, 1), (16, 14), (16, 10),
        (16, 6),
    ],
    [
        (0, 0), (0, 0), (3, 1), (7, 5), (8, 5), (9, 5), (10, 5), (11, 5),
        (13, 13), (13, 9), (14, 13), (14, 9), (15, 13), (15, 9), (16, 13), (16, 9),
        (16, 5),
    ],
    [
        (0, 0), (0, 0), (0, 0), (5, 3), (6, 3), (7, 4), (8, 4), (9, 4),
        (10, 4), (11, 4), (13, 12), (14, 12), (14, 8), (15, 12), (15, 8), (16, 12),
        (16, 8),
    ],
];

/// coeff_token, 2 <= nC < 4
pub(super) const COEFF_TOKEN_NC2: [[(u8, u16); 17]; 4] = [
    [
        (2, 3), (6, 11), (6, 7), (7, 7), (8, 7), (8, 4), (9, 7), (11, 15),
        (11, 11), (12, 15), (12, 11), (12, 8), (13, 15), (13, 11), (13, 7), (14, 9),
        (14, 7),
    ],
    [
        (0, 0), (2, 2), (5, 7), (6, 10), (6, 6), (7, 6), (8, 6), (9, 6),
        (11, 14), (11, 10), (12, 14), (12, 10), (13, 14), (13, 10), (14, 11), (14, 8),
        (14, 6),
    ],
    [
        (0, 0), (0, 0), (3, 3), (6, 9), (6, 5), (7, 5), (8, 5), (9, 5),
        (11, 13), (11, 9), (12, 13), (12, 9), (13, 13), (13, 9), (13, 6), (14, 10),
        (14, 5),
    ],
    [
        (0, 0), (0, 0), (0, 0), (4, 5), (4, 4), (5, 6), (6, 8), (6, 4),
        (7, 4), (9, 4), (11, 12), (11, 8), (12, 12), (13, 12), (13, 8), (13, 1),
        (14, 4),
    ],
];

/// coeff_token, 4 <= nC < 8
pub(super) const COEFF_TOKEN_NC4: [[(u8, u16); 17]; 4] = [
    [
        (4, 15), (6, 15), (6, 11), (6, 8), (7, 15), (7, 11), (7, 9), (7, 8),
        (8, 15), (8, 11), (9, 15), (9, 11), (9, 8), (10, 13), (10, 9), (10, 5),
        (10, 1),
    ],
    [
        (0, 0), (4, 14), (5, 15), (5, 12), (5, 10), (5, 8), (6, 14), (6, 10),
        (7, 14), (8, 14), (8, 10), (9, 14), (9, 10), (9, 7), (10, 12), (10, 8),
        (10, 4),
    ],
    [
        (0, 0), (0, 0), (4, 13), (5, 14), (5, 11), (5, 9), (6, 13), (6, 9),
        (7, 13), (7, 10), (8, 13), (8, 9), (9, 13), (9, 9), (10, 11), (10, 7),
        (10, 3),
    ],
    [
        (0, 0), (0, 0), (0, 0), (4, 12), (4, 11), (4, 10), (4, 9), (4, 8),
        (5, 13), (6, 12), (7, 12), (8, 12), (8, 8), (9, 12), (10, 10), (10, 6),
        (10, 2),
    ],
];

/// coeff_token, nC == -1 (4:2:0 色度 DC)
pub(super) const COEFF_TOKEN_CHROMA_DC: [[(u8, u16); 5]; 4] = [
    [(2, 1), (6, 7), (6, 4), (6, 3), (6, 2)],
    [(0, 0), (1, 1), (6, 6), (7, 3), (8, 3)],
    [(0, 0), (0, 0), (3, 1), (7, 2), (8, 2)],
    [(0, 0), (0, 0), (0, 0), (6, 5), (7, 0)],
];

/// coeff_token, nC == -2 (4:2:2 色度 DC)
pub(super) const COEFF_TOKEN_CHROMA_DC422: [[(u8, u16); 9]; 4] = [
    [
        (1, 1), (7, 15), (7, 14), (9, 7), (9, 6), (10, 7), (11, 7), (12, 7),
        (13, 7),
    ],
    [
        (0, 0), (2, 1), (7, 13), (7, 12), (9, 5), (10, 6), (11, 6), (12, 6),
        (12, 5),
    ],
    [
        (0, 0), (0, 0), (3, 1), (7, 11), (7, 10), (9, 4), (10, 5), (11, 5),
        (12, 4),
    ],
    [
        (0, 0), (0, 0), (0, 0), (5, 1), (6, 1), (7, 9), (7, 8), (10, 4),
        (11, 4),
    ],
];

/// total_zeros, 4x4 块, 下标 [total_coeff - 1][total_zeros]
pub(super) const TOTAL_ZEROS_4X4: [[(u8, u8); 16]; 15] = [
    [
        (1, 1), (3, 3), (3, 2), (4, 3), (4, 2), (5, 3), (5, 2), (6, 3),
        (6, 2), (7, 3), (7, 2), (8, 3), (8, 2), (9, 3), (9, 2), (9, 1),
    ],
    [
        (3, 7), (3, 6), (3, 5), (3, 4), (3, 3), (4, 5), (4, 4), (4, 3),
        (4, 2), (5, 3), (5, 2), (6, 3), (6, 2), (6, 1), (6, 0), (0, 0),
    ],
    [
        (4, 5), (3, 7), (3, 6), (3, 5), (4, 4), (4, 3), (3, 4), (3, 3),
        (4, 2), (5, 3), (5, 2), (6, 1), (5, 1), (6, 0), (0, 0), (0, 0),
    ],
    [
        (5, 3), (3, 7), (4, 5), (4, 4), (3, 6), (3, 5), (3, 4), (4, 3),
        (3, 3), (4, 2), (5, 2), (5, 1), (5, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (4, 5), (4, 4), (4, 3), (3, 7), (3, 6), (3, 5), (3, 4), (3, 3),
        (4, 2), (5, 1), (4, 1), (5, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (6, 1), (5, 1), (3, 7), (3, 6), (3, 5), (3, 4), (3, 3), (3, 2),
        (4, 1), (3, 1), (6, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (6, 1), (5, 1), (3, 5), (3, 4), (3, 3), (2, 3), (3, 2), (4, 1),
        (3, 1), (6, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (6, 1), (4, 1), (5, 1), (3, 3), (2, 3), (2, 2), (3, 2), (3, 1),
        (6, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (6, 1), (6, 0), (4, 1), (2, 3), (2, 2), (3, 1), (2, 1), (5, 1),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (5, 1), (5, 0), (3, 1), (2, 3), (2, 2), (2, 1), (4, 1), (0, 0),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (4, 0), (4, 1), (3, 1), (3, 2), (1, 1), (3, 3), (0, 0), (0, 0),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (4, 0), (4, 1), (2, 1), (1, 1), (3, 1), (0, 0), (0, 0), (0, 0),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (3, 0), (3, 1), (1, 1), (2, 1), (0, 0), (0, 0), (0, 0), (0, 0),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (2, 0), (2, 1), (1, 1), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (1, 0), (1, 1), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
];

/// total_zeros, 2x2 色度 DC, 下标 [total_coeff - 1][total_zeros]
pub(super) const TOTAL_ZEROS_2X2: [[(u8, u8); 4]; 3] = [
    [(1, 1), (2, 1), (3, 1), (3, 0)],
    [(1, 1), (2, 1), (2, 0), (0, 0)],
    [(1, 1), (1, 0), (0, 0), (0, 0)],
];

/// total_zeros, 2x4 色度 DC, 下标 [total_coeff - 1][total_zeros]
pub(super) const TOTAL_ZEROS_2X4: [[(u8, u8); 8]; 7] = [
    [(1, 1), (3, 2), (3, 3), (4, 2), (4, 3), (4, 1), (5, 1), (5, 0)],
    [(3, 0), (2, 1), (3, 1), (3, 4), (3, 5), (3, 6), (3, 7), (0, 0)],
    [(3, 0), (3, 1), (2, 1), (2, 2), (3, 6), (3, 7), (0, 0), (0, 0)],
    [(3, 6), (2, 0), (2, 1), (2, 2), (3, 7), (0, 0), (0, 0), (0, 0)],
    [(2, 0), (2, 1), (2, 2), (2, 3), (0, 0), (0, 0), (0, 0), (0, 0)],
    [(2, 0), (2, 1), (1, 1), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0)],
    [(1, 0), (1, 1), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0)],
];

/// run_before, 下标 [min(zeros_left, 7) - 1][run_before]
pub(super) const RUN_BEFORE: [[(u8, u8); 15]; 7] = [
    [
        (1, 1), (1, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (1, 1), (2, 1), (2, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (2, 3), (2, 2), (2, 1), (2, 0), (0, 0), (0, 0), (0, 0), (0, 0),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (2, 3), (2, 2), (2, 1), (3, 1), (3, 0), (0, 0), (0, 0), (0, 0),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (2, 3), (2, 2), (3, 3), (3, 2), (3, 1), (3, 0), (0, 0), (0, 0),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (2, 3), (3, 0), (3, 1), (3, 3), (3, 2), (3, 5), (3, 4), (0, 0),
        (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0),
    ],
    [
        (3, 7), (3, 6), (3, 5), (3, 4), (3, 3), (3, 2), (3, 1), (4, 1),
        (5, 1), (6, 1), (7, 1), (8, 1), (9, 1), (10, 1), (11, 1),
    ],
];

/// 帧内宏块 coded_block_pattern → codeNum (下标为 CBP 值)
pub(super) const CBP_INTRA_TO_CODE: [u8; 48] = [
    3, 29, 30, 17, 31, 18, 37, 8, 32, 38, 19, 9, 20, 10, 11, 2, 16, 33, 34, 21, 35, 22, 39, 4, 36,
    40, 23, 5, 24, 6, 7, 1, 41, 42, 43, 25, 44, 26, 46, 12, 45, 47, 27, 13, 28, 14, 15, 0,
];

/// 帧间宏块 coded_block_pattern → codeNum
pub(super) const CBP_INTER_TO_CODE: [u8; 48] = [
    0, 2, 3, 7, 4, 8, 17, 13, 5, 18, 9, 14, 10, 15, 16, 11, 1, 32, 33, 36, 34, 37, 44, 40, 35, 45,
    38, 41, 39, 42, 43, 19, 6, 24, 25, 20, 26, 21, 46, 28, 27, 47, 22, 29, 23, 30, 31, 12,
];
