macro_rules! try_vec {
	($elem:expr; $size:expr) => {{ $crate::util::alloc::fallible_vec_from_element($elem, $size)? }};
}

// `return Err(..)` with an `ErrorKind`
//
// err!(TooMuchData)
// err!(BadAtom("message"))
macro_rules! err {
	($variant:ident) => {
		return Err(crate::error::TagspliceError::new(
			crate::error::ErrorKind::$variant,
		))
	};
	($variant:ident($reason:literal)) => {
		return Err(crate::error::TagspliceError::new(
			crate::error::ErrorKind::$variant($reason),
		))
	};
}

// A `FileDecodingError`, optionally tied to a `FileType`
//
// decode_err!(Mpeg, "message")
// decode_err!(@BAIL Wav, "message") returns it
macro_rules! decode_err {
	($file_ty:ident, $reason:literal) => {
		Into::<crate::error::TagspliceError>::into(crate::error::FileDecodingError::new(
			crate::file::FileType::$file_ty,
			$reason,
		))
	};
	($reason:literal) => {
		Into::<crate::error::TagspliceError>::into(
			crate::error::FileDecodingError::from_description($reason),
		)
	};
	(@BAIL $($file_ty:ident,)? $reason:literal) => {
		return Err(decode_err!($($file_ty,)? $reason))
	};
}

// `return Err(..)` with an `Id3v2ErrorKind`
macro_rules! id3v2_err {
	($variant:ident) => {
		return Err(crate::error::Id3v2Error::new(crate::error::Id3v2ErrorKind::$variant).into())
	};
	($variant:ident($($value:expr),+)) => {
		return Err(
			crate::error::Id3v2Error::new(crate::error::Id3v2ErrorKind::$variant($($value),+))
				.into(),
		)
	};
}

// Branch on a `ParsingMode`, any mode without an arm takes `DEFAULT`
//
// parse_mode_choice!(
// 	mode,
// 	STRICT: err!(SizeMismatch),
// 	DEFAULT: break,
// )
macro_rules! parse_mode_choice {
	(
		$parse_mode:ident,
		$(STRICT: $strict_handler:expr,)?
		DEFAULT: $default:expr $(,)?
	) => {
		match $parse_mode {
			$(crate::config::ParsingMode::Strict => { $strict_handler },)?
			#[allow(unreachable_patterns)]
			_ => { $default }
		}
	};
}

pub(crate) use {decode_err, err, id3v2_err, parse_mode_choice, try_vec};
