pub mod convolution2d;
