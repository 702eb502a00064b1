
use std::{ any::Any,
           fmt::{ self,
                  Debug,
                  Display,
                  Formatter },
           rc::Rc };
use crate::runtime::{ data_structures::function_dictionary::Functor,
                      error::{ self,
                               script_error_kind,
                               ErrorKind },
                      interpreter::Interpreter };



/// A reference to a resource owned by something outside the interpreter core, a connection or a
/// file handle for instance.  The core only stores and passes these along, it never looks inside.
#[derive(Clone)]
pub struct OpaqueHandle
{
    /// Name of the kind of resource, shown when the value is printed.
    type_name: String,

    /// The resource itself.
    handle: Rc<dyn Any>
}


impl OpaqueHandle
{
    /// Wrap a resource for storage in a tuple.
    pub fn new<T: Any>(type_name: &str, handle: T) -> OpaqueHandle
    {
        OpaqueHandle { type_name: type_name.to_string(), handle: Rc::new(handle) }
    }

    /// The kind of resource being held.
    pub fn type_name(&self) -> &str
    {
        &self.type_name
    }

    /// Borrow the resource if it is of the expected type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T>
    {
        self.handle.downcast_ref::<T>()
    }
}


/// Handles compare by identity.
impl PartialEq for OpaqueHandle
{
    fn eq(&self, other: &OpaqueHandle) -> bool
    {
        Rc::ptr_eq(&self.handle, &other.handle)
    }
}



/// The value held by a tuple.  This is a closed set, every command that needs a particular kind
/// of value asks for it through one of the conversion methods and gets a script error back when
/// the value can not be converted.
#[derive(Clone, Default)]
pub enum Value
{
    /// The value represents nothing and no data is associated.
    #[default]
    None,

    /// We have an integer value.  Represented as an i64.
    Int(i64),

    /// A floating-point value  Represented as a f64.
    Float(f64),

    /// A boolean value.  Conditions of IF and WHILE must be this variant or the exact text
    /// `true` or `false`, there is no numeric truthiness.
    Bool(bool),

    /// A string value, represented by a Rust string.
    String(String),

    /// Raw binary data, a saved dictionary image for example.
    Bytes(Rc<Vec<u8>>),

    /// An anonymous function created by FUN.
    Functor(Rc<Functor>),

    /// A resource managed outside of the core.
    Handle(OpaqueHandle)
}


/// Convert an arbitrary data type to a Value.
pub trait ToValue
{
    /// Implement to handle the actual conversion.
    fn to_value(&self) -> Value;
}


/// Convert a borrowed string into a Value.
impl ToValue for &str
{
    fn to_value(&self) -> Value
    {
        Value::String(self.to_string())
    }
}


/// Sizes show up as stack depths and counts, they're held as integers.
impl ToValue for usize
{
    fn to_value(&self) -> Value
    {
        Value::Int(*self as i64)
    }
}


/// Values compare structurally, except that integers and floats compare numerically with each
/// other and functors and handles compare by identity.
impl PartialEq for Value
{
    fn eq(&self, other: &Value) -> bool
    {
        match (self, other)
        {
            ( Value::None,        Value::None        ) => true,
            ( Value::Int(a),      Value::Int(b)      ) => a == b,
            ( Value::Float(a),    Value::Float(b)    ) => a == b,
            ( Value::Int(a),      Value::Float(b)    ) => (*a as f64) == *b,
            ( Value::Float(a),    Value::Int(b)      ) => *a == (*b as f64),
            ( Value::Bool(a),     Value::Bool(b)     ) => a == b,
            ( Value::String(a),   Value::String(b)   ) => a == b,
            ( Value::Bytes(a),    Value::Bytes(b)    ) => a == b,
            ( Value::Functor(a),  Value::Functor(b)  ) => Rc::ptr_eq(a, b),
            ( Value::Handle(a),   Value::Handle(b)   ) => a == b,
            _ => false
        }
    }
}


/// Pretty print the value for display.
impl Display for Value
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result
    {
        match self
        {
            Value::None           => write!(f, "null"),
            Value::Int(value)     => write!(f, "{}", value),
            Value::Float(value)   => write!(f, "{}", value),
            Value::Bool(value)    => write!(f, "{}", value),
            Value::String(value)  => write!(f, "{}", value),
            Value::Bytes(value)   => write!(f, "<{} bytes>", value.len()),
            Value::Functor(value) => write!(f, "{}", value),
            Value::Handle(value)  => write!(f, "<{}>", value.type_name())
        }
    }
}


impl Debug for Value
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result
    {
        match self
        {
            Value::String(value) => write!(f, "{:?}", value),
            _ => write!(f, "{}: {}", self.type_name(), self)
        }
    }
}


/// Define implementations for converting between Values and the raw data types they represent.
macro_rules! value_conversion
{
    ($data_type:ty , $variant:ident , $as_ident:ident) =>
    {
        #[doc = concat!("Borrow the value as ", stringify!($data_type), " if that is exactly what it holds.")]
        impl Value
        {
            pub fn $as_ident(&self, interpreter: &dyn Interpreter) -> error::Result<&$data_type>
            {
                match self
                {
                    Value::$variant(value) => Ok(value),
                    _ => script_error_kind(interpreter,
                                           ErrorKind::Resolution,
                                           format!("Expected a {} value, found {} {}.",
                                                   stringify!($variant),
                                                   self.type_name(),
                                                   self))
                }
            }
        }


        #[doc = concat!("Allow conversion from ", stringify!($data_type), " to a Value.")]
        impl ToValue for $data_type
        {
            fn to_value(&self) -> Value
            {
                Value::$variant(self.clone())
            }
        }


        #[doc = concat!("Support converting from a ", stringify!($data_type), " to a Value.")]
        impl From<$data_type> for Value
        {
            fn from(original: $data_type) -> Value
            {
                original.to_value()
            }
        }
    };
}


value_conversion!(i64,             Int,     as_int);
value_conversion!(f64,             Float,   as_float);
value_conversion!(bool,            Bool,    as_bool);
value_conversion!(String,          String,  as_string);
value_conversion!(Rc<Vec<u8>>,     Bytes,   as_bytes);
value_conversion!(Rc<Functor>,     Functor, as_functor);
value_conversion!(OpaqueHandle,    Handle,  as_handle);


impl From<&str> for Value
{
    fn from(original: &str) -> Value
    {
        original.to_value()
    }
}


/// Parse integer text.  Accepts an optional sign, decimal digits, `0x` hexadecimal or `0b` binary,
/// with `_` allowed as a separator for readability.  The sign is parsed together with the digits
/// so the full i64 range is available, and only one sign is allowed.
pub fn parse_int(text: &str) -> Option<i64>
{
    let text = text.trim().replace('_', "");
    let ( sign, unsigned ) = match text.strip_prefix('-')
        {
            Some(rest) => ( "-", rest ),
            None       => ( "", text.strip_prefix('+').unwrap_or(text.as_str()) )
        };

    let ( radix, digits ) = if let Some(hex) = unsigned.strip_prefix("0x")
        {
            ( 16, hex )
        }
        else if let Some(binary) = unsigned.strip_prefix("0b")
        {
            ( 2, binary )
        }
        else
        {
            ( 10, unsigned )
        };

    if digits.starts_with(['+', '-'])
    {
        return None;
    }

    i64::from_str_radix(&format!("{}{}", sign, digits), radix).ok()
}


impl Value
{
    /// Name of the variant, for messages and `tuple -typename`.
    pub fn type_name(&self) -> &'static str
    {
        match self
        {
            Value::None       => "null",
            Value::Int(_)     => "int",
            Value::Float(_)   => "float",
            Value::Bool(_)    => "bool",
            Value::String(_)  => "string",
            Value::Bytes(_)   => "bytes",
            Value::Functor(_) => "functor",
            Value::Handle(_)  => "handle"
        }
    }

    /// Check if the value is the None variant.
    pub fn is_none(&self) -> bool
    {
        matches!(self, Value::None)
    }

    /// Check if either of the two values are floats.
    pub fn either_is_float(a: &Value, b: &Value) -> bool
    {
        matches!(a, Value::Float(_)) || matches!(b, Value::Float(_))
    }

    /// Coerce to an integer.  Integers pass through and strings are parsed, anything else is a
    /// type error.  Floats are not truncated.
    pub fn to_int(&self, interpreter: &dyn Interpreter) -> error::Result<i64>
    {
        let converted = match self
            {
                Value::Int(value)    => Some(*value),
                Value::String(value) => parse_int(value),
                _                    => None
            };

        match converted
        {
            Some(value) => Ok(value),
            None => script_error_kind(interpreter,
                                      ErrorKind::Resolution,
                                      format!("Can not convert {} {} to an integer.",
                                              self.type_name(),
                                              self))
        }
    }

    /// Coerce to a float.  Integers widen, strings are parsed.
    pub fn to_float(&self, interpreter: &dyn Interpreter) -> error::Result<f64>
    {
        let converted = match self
            {
                Value::Int(value)    => Some(*value as f64),
                Value::Float(value)  => Some(*value),
                Value::String(value) => parse_int(value).map(|value| value as f64)
                                                        .or_else(|| value.trim().parse().ok()),
                _                    => None
            };

        match converted
        {
            Some(value) => Ok(value),
            None => script_error_kind(interpreter,
                                      ErrorKind::Resolution,
                                      format!("Can not convert {} {} to a float.",
                                              self.type_name(),
                                              self))
        }
    }

    /// Coerce to a boolean.  Only a Bool or the exact text `true` or `false` qualify, there is no
    /// numeric truthiness.
    pub fn to_bool(&self, interpreter: &dyn Interpreter) -> error::Result<bool>
    {
        match self
        {
            Value::Bool(value) => Ok(*value),
            Value::String(value) if value == "true" => Ok(true),
            Value::String(value) if value == "false" => Ok(false),
            _ => script_error_kind(interpreter,
                                   ErrorKind::Resolution,
                                   format!("Can not convert {} {} to a boolean.",
                                           self.type_name(),
                                           self))
        }
    }

    /// The text form of the value.
    pub fn to_text(&self) -> String
    {
        self.to_string()
    }

    /// Coerce to a number, an integer when possible.  Used by arithmetic that accepts either.
    pub fn to_number(&self) -> Option<Value>
    {
        match self
        {
            Value::Int(_) | Value::Float(_) => Some(self.clone()),
            Value::String(text) => parse_int(text).map(Value::Int)
                                                  .or_else(|| text.trim()
                                                                  .parse::<f64>()
                                                                  .ok()
                                                                  .map(Value::Float)),
            _ => None
        }
    }
}


#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn parses_integer_forms()
    {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("-42"), Some(-42));
        assert_eq!(parse_int("+7"), Some(7));
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("-0b101"), Some(-5));
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_int("4.2"), None);
        assert_eq!(parse_int("abc"), None);
    }

    #[test]
    fn parses_the_full_range_with_one_sign()
    {
        assert_eq!(parse_int("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_int("9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_int("-0x8000000000000000"), Some(i64::MIN));
        assert_eq!(parse_int("9223372036854775808"), None);
        assert_eq!(parse_int("--5"), None);
        assert_eq!(parse_int("-+5"), None);
        assert_eq!(parse_int("+-5"), None);
        assert_eq!(parse_int("0x-5"), None);
        assert_eq!(parse_int("-"), None);
    }

    #[test]
    fn numbers_compare_across_variants()
    {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::Int(2), Value::String("2".into()));
        assert_ne!(Value::Bool(true), Value::String("true".into()));
    }

    #[test]
    fn handles_compare_by_identity()
    {
        let handle = OpaqueHandle::new("socket", 7_u32);
        let same = Value::Handle(handle.clone());

        assert_eq!(Value::Handle(handle.clone()), same);
        assert_ne!(Value::Handle(OpaqueHandle::new("socket", 7_u32)), same);
        assert_eq!(handle.downcast_ref::<u32>(), Some(&7));
        assert_eq!(same.to_string(), "<socket>");
    }
}
